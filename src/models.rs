//! Data models for NASA FIRMS country feeds.
//!
//! FIRMS serves hotspot detections as CSV with a header row. Column sets
//! differ between products (MODIS carries `brightness`, VIIRS carries
//! `bright_ti4`), so raw rows are kept schema-flexible and resolved into
//! [`Detection`] by the normalizer.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::FiresiftError;

/// Representative numeric values for categorical confidence classes.
pub const CONFIDENCE_LOW: f64 = 15.0;
pub const CONFIDENCE_NOMINAL: f64 = 55.0;
pub const CONFIDENCE_HIGH: f64 = 90.0;

/// One raw CSV record keyed by header name.
///
/// Empty-after-trim fields read as absent, so downstream code never has
/// to distinguish a missing column from a blank cell.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    /// Build a row by zipping a header record with a data record.
    ///
    /// Short records simply yield fewer fields; extras past the header
    /// are ignored.
    #[must_use]
    pub fn from_record(headers: &csv::StringRecord, record: &csv::StringRecord) -> Self {
        let fields = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        Self { fields }
    }

    /// Get a field value, treating blank cells as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Get a field parsed as `f64`, if present and numeric.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}

/// Read rows from FIRMS-format CSV.
///
/// Malformed records are skipped. A body whose header row lacks a
/// `latitude` column is rejected outright: FIRMS reports problems like
/// bad API keys as plain text under HTTP 200.
///
/// # Errors
///
/// Returns an error when the header cannot be read or the body is not
/// detection CSV at all.
pub fn read_rows<R: std::io::Read>(reader: R) -> Result<Vec<RawRow>, FiresiftError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    if !headers.iter().any(|h| h.eq_ignore_ascii_case("latitude")) {
        let preview: String = headers.iter().collect::<Vec<_>>().join(",");
        return Err(FiresiftError::InvalidResponse(format!(
            "not a detection feed, first line: {}",
            preview.chars().take(120).collect::<String>()
        )));
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        match record {
            Ok(r) => rows.push(RawRow::from_record(&headers, &r)),
            Err(_) => continue,
        }
    }
    Ok(rows)
}

/// Column names that vary between FIRMS products.
#[derive(Debug, Clone, Copy)]
pub struct RowSchema {
    /// Brightness temperature column (`brightness` or `bright_ti4`).
    pub brightness: &'static str,
    /// Confidence column.
    pub confidence: &'static str,
}

/// MODIS feed columns.
pub const MODIS_SCHEMA: RowSchema = RowSchema {
    brightness: "brightness",
    confidence: "confidence",
};

/// VIIRS feed columns (SNPP and NOAA-20 share the layout).
pub const VIIRS_SCHEMA: RowSchema = RowSchema {
    brightness: "bright_ti4",
    confidence: "confidence",
};

/// Parse a FIRMS confidence field into a 0-100 numeric value.
///
/// MODIS reports integers; VIIRS reports categorical classes, abbreviated
/// to `l`/`n`/`h` in the CSV feeds. Categorical classes map to fixed
/// representative values. Unrecognized text yields `None`.
#[must_use]
pub fn parse_confidence(raw: &str) -> Option<f64> {
    let value = raw.trim();
    if let Ok(v) = value.parse::<f64>() {
        return v.is_finite().then_some(v);
    }
    match value.to_ascii_lowercase().as_str() {
        "low" | "l" => Some(CONFIDENCE_LOW),
        "nominal" | "n" => Some(CONFIDENCE_NOMINAL),
        "high" | "h" => Some(CONFIDENCE_HIGH),
        _ => None,
    }
}

/// A normalized hotspot detection.
///
/// This is the unit the filter chain, deduplicator, clusterer, and
/// aggregators all operate on.
#[derive(Debug, Clone, Serialize)]
pub struct Detection {
    /// Latitude in degrees, validated to [-90, 90].
    pub latitude: f64,

    /// Longitude in degrees, validated to [-180, 180].
    pub longitude: f64,

    /// Acquisition date (UTC).
    pub acq_date: NaiveDate,

    /// Acquisition time as a 4-digit HHMM string, empty when unknown.
    pub acq_time: String,

    /// Brightness temperature in Kelvin. NaN when the feed omitted it.
    pub brightness: f64,

    /// Numeric confidence 0-100; categorical classes mapped to their
    /// representative values. `None` when the field was unparseable.
    pub confidence: Option<f64>,

    /// Source text of the confidence field, `"unknown"` when absent.
    pub confidence_raw: String,

    /// Observing platform reported by the row (`Terra`, `Aqua`, `N`, ...).
    pub satellite: String,

    /// Label of the feed this row came from.
    pub source: String,

    /// Fire radiative power in MW.
    pub frp: Option<f64>,

    /// Along-scan pixel size (km).
    pub scan: Option<f64>,

    /// Along-track pixel size (km).
    pub track: Option<f64>,
}

impl Detection {
    /// `"lat, lon"` at 2-decimal precision, the dashboard's location label.
    #[must_use]
    pub fn location_label(&self) -> String {
        format!("{:.2}, {:.2}", self.latitude, self.longitude)
    }

    /// True when the feed supplied a usable brightness temperature.
    #[must_use]
    pub fn has_brightness(&self) -> bool {
        self.brightness.is_finite()
    }
}
