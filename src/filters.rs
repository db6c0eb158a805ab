//! Detection filtering logic.
//!
//! The filter chain runs in a fixed order: required fields, geography,
//! confidence, brightness. Every stage is a pure set filter and reports
//! its before/after counts, so a run can always explain where rows went.

use serde::Serialize;
use tracing::debug;

use crate::config::{CountryProfile, FilterConfig};
use crate::errors::FiresiftError;
use crate::models::Detection;

/// Bounding box for geographic filtering.
#[derive(Debug, Clone, Copy)]
pub struct BBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BBox {
    /// Check if a point is within the bounding box.
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// A named sub-region bounding box (Lac, Kanem, ...).
#[derive(Debug, Clone)]
pub struct NamedRegion {
    pub name: String,
    pub bounds: BBox,
}

/// Geographic scope of a run.
#[derive(Debug, Clone)]
pub enum AreaFilter {
    /// Whole-country bounding box.
    Country(BBox),
    /// Union of named sub-regions; a point passes if any box contains it.
    Regions(Vec<NamedRegion>),
}

impl AreaFilter {
    /// Check if a point is inside the configured area.
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        match self {
            Self::Country(bbox) => bbox.contains(lat, lon),
            Self::Regions(regions) => regions.iter().any(|r| r.bounds.contains(lat, lon)),
        }
    }

    /// Short description for the filters echo in the output document.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Country(bbox) => format!(
                "Lat {}-{}, Lon {}-{}",
                bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon
            ),
            Self::Regions(regions) => {
                let names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
                names.join(", ")
            }
        }
    }
}

/// Before/after counts for one filter stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub before: usize,
    pub after: usize,
}

/// The fixed filter chain applied after normalization.
#[derive(Debug, Clone)]
pub struct FilterChain {
    pub area: AreaFilter,
    /// Minimum confidence, 0 disables the stage.
    pub min_confidence: f64,
    /// Minimum brightness in Kelvin, 0 disables the stage.
    pub min_brightness: f64,
}

impl FilterChain {
    /// Build a chain from run configuration, resolving region names
    /// against the country profile.
    pub fn from_config(
        config: &FilterConfig,
        profile: &CountryProfile,
    ) -> Result<Self, FiresiftError> {
        let area = if config.use_regions {
            let mut resolved = Vec::with_capacity(config.regions.len());
            for name in &config.regions {
                let region = profile.region(name).ok_or_else(|| {
                    FiresiftError::InvalidConfig(format!(
                        "unknown region '{}', expected one of: {}",
                        name,
                        profile.region_names().join(", ")
                    ))
                })?;
                resolved.push(region);
            }
            if resolved.is_empty() {
                return Err(FiresiftError::InvalidConfig(
                    "region filtering enabled with no regions selected".into(),
                ));
            }
            AreaFilter::Regions(resolved)
        } else {
            AreaFilter::Country(profile.bounds)
        };

        Ok(Self {
            area,
            min_confidence: config.min_confidence,
            min_brightness: config.min_brightness,
        })
    }

    /// Check if a detection passes every stage.
    #[must_use]
    pub fn matches(&self, detection: &Detection) -> bool {
        check_required(detection)
            && self.check_area(detection)
            && self.check_confidence(detection)
            && self.check_brightness(detection)
    }

    /// Run the chain in order, reporting per-stage counts.
    #[must_use]
    pub fn apply(&self, detections: Vec<Detection>) -> (Vec<Detection>, Vec<StageReport>) {
        let mut kept = detections;
        let mut reports = Vec::with_capacity(4);

        let before = kept.len();
        kept.retain(check_required);
        reports.push(StageReport {
            stage: "required_fields",
            before,
            after: kept.len(),
        });

        let before = kept.len();
        kept.retain(|d| self.check_area(d));
        reports.push(StageReport {
            stage: "geography",
            before,
            after: kept.len(),
        });

        let before = kept.len();
        kept.retain(|d| self.check_confidence(d));
        reports.push(StageReport {
            stage: "confidence",
            before,
            after: kept.len(),
        });

        let before = kept.len();
        kept.retain(|d| self.check_brightness(d));
        reports.push(StageReport {
            stage: "brightness",
            before,
            after: kept.len(),
        });

        for r in &reports {
            debug!(stage = r.stage, before = r.before, after = r.after, "filter stage");
        }

        (kept, reports)
    }

    fn check_area(&self, detection: &Detection) -> bool {
        self.area.contains(detection.latitude, detection.longitude)
    }

    fn check_confidence(&self, detection: &Detection) -> bool {
        if self.min_confidence <= 0.0 {
            return true;
        }
        detection
            .confidence
            .is_some_and(|c| c >= self.min_confidence)
    }

    fn check_brightness(&self, detection: &Detection) -> bool {
        if self.min_brightness <= 0.0 {
            return true;
        }
        // NaN brightness fails an enabled threshold.
        detection.brightness >= self.min_brightness
    }
}

/// Coordinates in range and an acquisition date present.
///
/// The normalizer already guarantees this, so the stage is vacuous in the
/// assembled pipeline; it stays in the chain so the report always accounts
/// for it.
fn check_required(detection: &Detection) -> bool {
    detection.latitude.is_finite()
        && detection.longitude.is_finite()
        && (-90.0..=90.0).contains(&detection.latitude)
        && (-180.0..=180.0).contains(&detection.longitude)
}
