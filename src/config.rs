//! Run configuration and the country profile.
//!
//! Precedence is CLI flags > `filters_config.json` > built-in defaults.
//! The country profile (bounds, named sub-regions, fallback map center)
//! is part of the program, not the config file.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::errors::FiresiftError;
use crate::filters::{BBox, NamedRegion};

/// Inclusive day-window bounds accepted by the FIRMS country API.
pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 10;

/// Filter parameters for one pipeline run.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// How many days of the NRT archive to fetch (1-10).
    pub days: u32,

    /// Restrict to the named sub-regions instead of the whole country.
    pub use_regions: bool,

    /// Region names resolved against the country profile.
    pub regions: Vec<String>,

    /// Minimum confidence (0-100), 0 disables the stage.
    pub min_confidence: f64,

    /// Minimum brightness in Kelvin, 0 disables the stage.
    pub min_brightness: f64,

    /// Fetch VIIRS (SNPP + NOAA-20) in addition to MODIS.
    pub multi_source: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            days: 10,
            use_regions: false,
            regions: vec!["Lac".into(), "Mayo-Kebbi".into()],
            min_confidence: 30.0,
            min_brightness: 300.0,
            multi_source: true,
        }
    }
}

impl FilterConfig {
    /// Overlay file values. CLI flags are applied after this, so the
    /// effective precedence is flags > file > defaults.
    pub fn merge_file(&mut self, file: &FileConfig) {
        if let Some(days) = file.days {
            self.days = days;
        }
        if let Some(v) = file.use_regions {
            self.use_regions = v;
        }
        if let Some(regions) = &file.regions {
            self.regions.clone_from(regions);
        }
        if let Some(v) = file.min_confidence {
            self.min_confidence = v;
        }
        if let Some(v) = file.min_brightness {
            self.min_brightness = v;
        }
        if let Some(v) = file.multi_source {
            self.multi_source = v;
        }
    }

    /// Day window clamped into the API's accepted range.
    #[must_use]
    pub fn clamped_days(&self) -> u32 {
        if (MIN_DAYS..=MAX_DAYS).contains(&self.days) {
            self.days
        } else {
            let clamped = self.days.clamp(MIN_DAYS, MAX_DAYS);
            warn!(
                requested = self.days,
                using = clamped,
                "day window out of range, clamping"
            );
            clamped
        }
    }

    /// Reject values a run cannot proceed with.
    pub fn validate(&self) -> Result<(), FiresiftError> {
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(FiresiftError::InvalidConfig(format!(
                "min_confidence {} out of range [0, 100]",
                self.min_confidence
            )));
        }
        if !self.min_brightness.is_finite() || self.min_brightness < 0.0 {
            return Err(FiresiftError::InvalidConfig(format!(
                "min_brightness {} must be a non-negative number",
                self.min_brightness
            )));
        }
        Ok(())
    }
}

/// On-disk configuration, the `filters_config.json` schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub days: Option<u32>,
    pub use_regions: Option<bool>,
    pub regions: Option<Vec<String>>,
    pub min_confidence: Option<f64>,
    pub min_brightness: Option<f64>,
    pub multi_source: Option<bool>,
}

impl FileConfig {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, FiresiftError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Static description of the monitored country.
#[derive(Debug, Clone)]
pub struct CountryProfile {
    /// ISO alpha-3 code used in FIRMS country URLs.
    pub code: &'static str,
    pub name: &'static str,
    pub bounds: BBox,
    regions: Vec<NamedRegion>,
    /// Map center to report when no detections survive.
    pub fallback_center: (f64, f64),
}

impl CountryProfile {
    /// The default deployment target.
    #[must_use]
    pub fn chad() -> Self {
        Self {
            code: "TCD",
            name: "Chad",
            bounds: BBox {
                min_lat: 7.0,
                min_lon: 13.5,
                max_lat: 23.5,
                max_lon: 24.0,
            },
            regions: vec![
                named("Lac", 12.5, 13.5, 14.5, 15.5),
                named("Kanem", 13.0, 14.0, 16.0, 16.5),
                named("Batha", 12.0, 17.0, 14.5, 20.0),
                named("Salamat", 9.5, 19.5, 12.0, 22.0),
                named("Mayo-Kebbi", 8.0, 14.5, 10.5, 16.0),
                named("Logone Oriental", 7.5, 15.5, 9.5, 17.0),
            ],
            fallback_center: (15.45, 19.17),
        }
    }

    /// Look up a named region, case-insensitively.
    #[must_use]
    pub fn region(&self, name: &str) -> Option<NamedRegion> {
        self.regions
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// All region names, for error messages and help text.
    #[must_use]
    pub fn region_names(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.name.as_str()).collect()
    }

    /// All named regions, for the per-region breakdown.
    #[must_use]
    pub fn regions(&self) -> &[NamedRegion] {
        &self.regions
    }
}

fn named(name: &str, min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> NamedRegion {
    NamedRegion {
        name: name.into(),
        bounds: BBox {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        },
    }
}
