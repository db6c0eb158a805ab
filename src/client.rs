//! NASA FIRMS country API client.
//!
//! Provides blocking HTTP access to the FIRMS country CSV feeds.
//! Uses reqwest with rustls for TLS. Requests carry the caller's API
//! key in the URL, so the key is never logged.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, instrument, warn};

use crate::errors::FiresiftError;
use crate::models::{MODIS_SCHEMA, RawRow, RowSchema, VIIRS_SCHEMA, read_rows};

/// Per-attempt request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Attempts per product before giving up on it.
pub const FETCH_ATTEMPTS: u32 = 2;

/// Delay between attempts in seconds.
const RETRY_DELAY_SECS: u64 = 2;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("firesift/", env!("CARGO_PKG_VERSION"));

/// FIRMS base URL.
const FIRMS_BASE_URL: &str = "https://firms.modaps.eosdis.nasa.gov";

/// Near-real-time products served by the country API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmsProduct {
    ModisNrt,
    ViirsSnppNrt,
    ViirsNoaa20Nrt,
}

impl FirmsProduct {
    /// Every product, in fetch order.
    pub const ALL: [Self; 3] = [Self::ModisNrt, Self::ViirsSnppNrt, Self::ViirsNoaa20Nrt];

    /// URL path segment for this product.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ModisNrt => "MODIS_NRT",
            Self::ViirsSnppNrt => "VIIRS_SNPP_NRT",
            Self::ViirsNoaa20Nrt => "VIIRS_NOAA20_NRT",
        }
    }

    /// Human-readable source label carried on detections.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ModisNrt => "MODIS (Terra+Aqua)",
            Self::ViirsSnppNrt => "VIIRS (SNPP)",
            Self::ViirsNoaa20Nrt => "VIIRS (NOAA-20)",
        }
    }

    /// Column layout of this product's CSV.
    #[must_use]
    pub const fn schema(self) -> RowSchema {
        match self {
            Self::ModisNrt => MODIS_SCHEMA,
            Self::ViirsSnppNrt | Self::ViirsNoaa20Nrt => VIIRS_SCHEMA,
        }
    }
}

impl std::str::FromStr for FirmsProduct {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "modis" | "modis_nrt" => Ok(Self::ModisNrt),
            "viirs-snpp" | "viirs_snpp" | "viirs_snpp_nrt" => Ok(Self::ViirsSnppNrt),
            "viirs-noaa20" | "viirs_noaa20" | "viirs_noaa20_nrt" => Ok(Self::ViirsNoaa20Nrt),
            _ => Err(format!("unknown product: {s}")),
        }
    }
}

/// Client for the FIRMS country CSV API.
pub struct FirmsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FirmsClient {
    /// Create a new FIRMS client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(api_key: impl Into<String>) -> Result<Self, FiresiftError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: FIRMS_BASE_URL.to_string(),
            api_key: api_key.into(),
        })
    }

    /// Fetch one product's rows for a country and day window.
    ///
    /// Makes up to [`FETCH_ATTEMPTS`] attempts with a fixed delay in
    /// between; an empty body counts as a failed attempt.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error when every attempt fails.
    #[instrument(skip(self), fields(product = product.as_str()))]
    pub fn fetch_product(
        &self,
        product: FirmsProduct,
        country: &str,
        days: u32,
    ) -> Result<Vec<RawRow>, FiresiftError> {
        let url = self.product_url(product, country, days);
        debug!(country, days, "fetching FIRMS product");

        let mut last_err = FiresiftError::NoDataAvailable {
            attempts: FETCH_ATTEMPTS,
        };
        for attempt in 1..=FETCH_ATTEMPTS {
            if attempt > 1 {
                std::thread::sleep(Duration::from_secs(RETRY_DELAY_SECS));
            }
            match self.try_fetch(&url) {
                Ok(rows) => {
                    debug!(rows = rows.len(), "fetched product rows");
                    return Ok(rows);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "fetch attempt failed");
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    fn product_url(&self, product: FirmsProduct, country: &str, days: u32) -> String {
        format!(
            "{}/api/country/csv/{}/{}/{}/{}",
            self.base_url,
            self.api_key,
            product.as_str(),
            country,
            days
        )
    }

    fn try_fetch(&self, url: &str) -> Result<Vec<RawRow>, FiresiftError> {
        let response = self.client.get(url).send()?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FiresiftError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text()?;
        if body.trim().is_empty() {
            return Err(FiresiftError::InvalidResponse(
                "empty response body".into(),
            ));
        }

        read_rows(body.as_bytes())
    }
}
