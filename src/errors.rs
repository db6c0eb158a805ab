//! Error types for firesift.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur in firesift operations.
#[derive(Error, Debug)]
pub enum FiresiftError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// CSV parsing failed
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body was not the expected CSV
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Every configured source failed to yield data
    #[error("no data available from any source after {attempts} attempts")]
    NoDataAvailable { attempts: u32 },

    /// Configuration validation failed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Boundary file could not be read or interpreted
    #[error("Boundary data error: {0}")]
    Geo(String),

    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
