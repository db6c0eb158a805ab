//! Summary statistics for the dashboard.
//!
//! Field names and the French label keys are part of the dashboard
//! contract and must not change.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::filters::NamedRegion;
use crate::models::Detection;

/// Date range reported when no detections survive.
pub const EMPTY_DATE_RANGE: &str = "N/A";

/// Confidence band tallies keyed the way the dashboard reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfidenceCounts {
    #[serde(rename = "Détections Haute Confiance")]
    pub high: usize,

    #[serde(rename = "Détections Nominale Confiance")]
    pub nominal: usize,

    #[serde(rename = "Détections Basse Confiance")]
    pub low: usize,

    #[serde(rename = "Détections Confiance Inconnue")]
    pub unknown: usize,
}

/// The `stats` block of the output document.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_detections: usize,
    pub confidence_counts: ConfidenceCounts,
    /// Detections per feed label. The key name is historical; the values
    /// count sources, not platforms.
    pub satellite_counts: BTreeMap<String, usize>,
    /// `"<max> - <min>"`, newest first.
    pub recent_date_range: String,
}

/// Aggregate the surviving detections.
///
/// Bands on numeric confidence: high above 79, nominal 30 to 79
/// inclusive, low below 30; unparseable confidence lands in unknown.
/// Empty input yields all-zero counts and the sentinel range.
#[must_use]
pub fn compute(detections: &[Detection]) -> DashboardStats {
    let mut confidence_counts = ConfidenceCounts::default();
    let mut satellite_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut min_date: Option<NaiveDate> = None;
    let mut max_date: Option<NaiveDate> = None;

    for d in detections {
        match d.confidence {
            Some(c) if c > 79.0 => confidence_counts.high += 1,
            Some(c) if c >= 30.0 => confidence_counts.nominal += 1,
            Some(_) => confidence_counts.low += 1,
            None => confidence_counts.unknown += 1,
        }
        *satellite_counts.entry(d.source.clone()).or_insert(0) += 1;
        min_date = Some(min_date.map_or(d.acq_date, |m| m.min(d.acq_date)));
        max_date = Some(max_date.map_or(d.acq_date, |m| m.max(d.acq_date)));
    }

    let recent_date_range = match (max_date, min_date) {
        (Some(max), Some(min)) => format!("{max} - {min}"),
        _ => EMPTY_DATE_RANGE.to_string(),
    };

    DashboardStats {
        total_detections: detections.len(),
        confidence_counts,
        satellite_counts,
        recent_date_range,
    }
}

/// Median latitude/longitude of the detections, or the fallback center
/// when the set is empty.
#[must_use]
pub fn map_center(detections: &[Detection], fallback: (f64, f64)) -> (f64, f64) {
    if detections.is_empty() {
        return fallback;
    }
    let mut lats: Vec<f64> = detections.iter().map(|d| d.latitude).collect();
    let mut lons: Vec<f64> = detections.iter().map(|d| d.longitude).collect();
    (median(&mut lats), median(&mut lons))
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Detections per named region, zero-count regions omitted.
///
/// Region rectangles overlap, so a detection can count toward more than
/// one region.
#[must_use]
pub fn region_breakdown(detections: &[Detection], regions: &[NamedRegion]) -> Vec<(String, usize)> {
    let mut breakdown = Vec::new();
    for region in regions {
        let count = detections
            .iter()
            .filter(|d| region.bounds.contains(d.latitude, d.longitude))
            .count();
        if count > 0 {
            breakdown.push((region.name.clone(), count));
        }
    }
    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CountryProfile;

    fn det(lat: f64, lon: f64, date: &str, confidence: Option<f64>, source: &str) -> Detection {
        Detection {
            latitude: lat,
            longitude: lon,
            acq_date: date.parse().unwrap(),
            acq_time: "1200".into(),
            brightness: 320.0,
            confidence,
            confidence_raw: confidence.map_or_else(|| "unknown".into(), |c| format!("{c}")),
            satellite: "Terra".into(),
            source: source.into(),
            frp: None,
            scan: None,
            track: None,
        }
    }

    #[test]
    fn test_band_boundaries() {
        let input = vec![
            det(12.0, 18.0, "2026-08-20", Some(80.0), "MODIS (Terra+Aqua)"),
            det(12.1, 18.0, "2026-08-20", Some(79.5), "MODIS (Terra+Aqua)"),
            det(12.2, 18.0, "2026-08-20", Some(79.0), "MODIS (Terra+Aqua)"),
            det(12.3, 18.0, "2026-08-20", Some(30.0), "MODIS (Terra+Aqua)"),
            det(12.4, 18.0, "2026-08-20", Some(29.9), "MODIS (Terra+Aqua)"),
            det(12.5, 18.0, "2026-08-20", None, "MODIS (Terra+Aqua)"),
        ];

        let stats = compute(&input);
        assert_eq!(stats.total_detections, 6);
        assert_eq!(stats.confidence_counts.high, 2);
        assert_eq!(stats.confidence_counts.nominal, 2);
        assert_eq!(stats.confidence_counts.low, 1);
        assert_eq!(stats.confidence_counts.unknown, 1);

        let c = &stats.confidence_counts;
        assert_eq!(c.high + c.nominal + c.low + c.unknown, stats.total_detections);
    }

    #[test]
    fn test_date_range_newest_first() {
        let input = vec![
            det(12.0, 18.0, "2026-08-16", Some(50.0), "MODIS (Terra+Aqua)"),
            det(12.1, 18.0, "2026-08-22", Some(50.0), "MODIS (Terra+Aqua)"),
            det(12.2, 18.0, "2026-08-19", Some(50.0), "MODIS (Terra+Aqua)"),
        ];
        let stats = compute(&input);
        assert_eq!(stats.recent_date_range, "2026-08-22 - 2026-08-16");
    }

    #[test]
    fn test_source_counts() {
        let input = vec![
            det(12.0, 18.0, "2026-08-20", Some(50.0), "MODIS (Terra+Aqua)"),
            det(12.1, 18.0, "2026-08-20", Some(50.0), "VIIRS (SNPP)"),
            det(12.2, 18.0, "2026-08-20", Some(50.0), "MODIS (Terra+Aqua)"),
        ];
        let stats = compute(&input);
        assert_eq!(stats.satellite_counts["MODIS (Terra+Aqua)"], 2);
        assert_eq!(stats.satellite_counts["VIIRS (SNPP)"], 1);
    }

    #[test]
    fn test_empty_input_all_zero() {
        let stats = compute(&[]);
        assert_eq!(stats.total_detections, 0);
        assert_eq!(stats.confidence_counts, ConfidenceCounts::default());
        assert!(stats.satellite_counts.is_empty());
        assert_eq!(stats.recent_date_range, EMPTY_DATE_RANGE);
    }

    #[test]
    fn test_confidence_keys_serialize_verbatim() {
        let json = serde_json::to_string(&ConfidenceCounts::default()).unwrap();
        assert!(json.contains("Détections Haute Confiance"));
        assert!(json.contains("Détections Nominale Confiance"));
        assert!(json.contains("Détections Basse Confiance"));
        assert!(json.contains("Détections Confiance Inconnue"));
    }

    #[test]
    fn test_map_center_median() {
        let input = vec![
            det(10.0, 20.0, "2026-08-20", Some(50.0), "MODIS (Terra+Aqua)"),
            det(12.0, 21.0, "2026-08-20", Some(50.0), "MODIS (Terra+Aqua)"),
            det(20.0, 23.0, "2026-08-20", Some(50.0), "MODIS (Terra+Aqua)"),
        ];
        let (lat, lon) = map_center(&input, (15.45, 19.17));
        assert!((lat - 12.0).abs() < 1e-9);
        assert!((lon - 21.0).abs() < 1e-9);

        let (lat, lon) = map_center(&input[..2], (15.45, 19.17));
        assert!((lat - 11.0).abs() < 1e-9);
        assert!((lon - 20.5).abs() < 1e-9);
    }

    #[test]
    fn test_map_center_fallback() {
        let (lat, lon) = map_center(&[], (15.45, 19.17));
        assert!((lat - 15.45).abs() < 1e-9);
        assert!((lon - 19.17).abs() < 1e-9);
    }

    #[test]
    fn test_region_breakdown_overlap_and_omission() {
        let profile = CountryProfile::chad();
        // 13.12, 15.23 sits in both Lac and Kanem.
        let input = vec![
            det(13.12, 15.23, "2026-08-20", Some(50.0), "MODIS (Terra+Aqua)"),
            det(10.5, 20.5, "2026-08-21", Some(50.0), "MODIS (Terra+Aqua)"),
        ];

        let breakdown = region_breakdown(&input, profile.regions());
        let get = |name: &str| {
            breakdown
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, c)| *c)
        };
        assert_eq!(get("Lac"), Some(1));
        assert_eq!(get("Kanem"), Some(1));
        assert_eq!(get("Salamat"), Some(1));
        assert_eq!(get("Batha"), None); // zero hits omitted
    }
}
