//! Record normalization.
//!
//! Raw CSV rows become [`Detection`]s here. A row needs parseable
//! coordinates in range and an acquisition date; anything else missing
//! degrades to a sentinel. Bad rows are dropped and counted, never an
//! error.

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{Detection, RawRow, RowSchema, parse_confidence};

/// Normalize raw rows from one feed into detections.
///
/// Returns the detections plus how many rows were dropped for missing or
/// out-of-range required fields.
#[must_use]
pub fn normalize(rows: &[RawRow], schema: RowSchema, source: &str) -> (Vec<Detection>, usize) {
    let mut detections = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;

    for row in rows {
        match normalize_row(row, schema, source) {
            Some(d) => detections.push(d),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, source, "rows dropped during normalization");
    }
    (detections, dropped)
}

fn normalize_row(row: &RawRow, schema: RowSchema, source: &str) -> Option<Detection> {
    let latitude = row.get_f64("latitude")?;
    let longitude = row.get_f64("longitude")?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }
    let acq_date = NaiveDate::parse_from_str(row.get("acq_date")?, "%Y-%m-%d").ok()?;

    let confidence_raw = row.get(schema.confidence).unwrap_or("unknown").to_string();
    let confidence = parse_confidence(&confidence_raw);

    Some(Detection {
        latitude,
        longitude,
        acq_date,
        acq_time: format_acq_time(row.get("acq_time")),
        brightness: row.get_f64(schema.brightness).unwrap_or(f64::NAN),
        confidence,
        confidence_raw,
        satellite: row.get("satellite").unwrap_or("unknown_sat").to_string(),
        source: source.to_string(),
        frp: row.get_f64("frp"),
        scan: row.get_f64("scan"),
        track: row.get_f64("track"),
    })
}

/// Acquisition times arrive as bare integers (`112` means 01:12 UTC),
/// occasionally with a float tail. Zero-pad to 4 digits; anything
/// non-numeric becomes the empty string.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // value checked non-negative finite
fn format_acq_time(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => format!("{:04}", v.trunc() as u32),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CONFIDENCE_NOMINAL, MODIS_SCHEMA, VIIRS_SCHEMA};

    const MODIS_HEADER: &str =
        "latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_t31,frp,daynight";
    const VIIRS_HEADER: &str =
        "latitude,longitude,bright_ti4,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_ti5,frp,daynight";

    fn rows_from(text: &str) -> Vec<RawRow> {
        crate::models::read_rows(text.as_bytes()).unwrap()
    }

    fn modis_rows(lines: &str) -> Vec<RawRow> {
        rows_from(&format!("{MODIS_HEADER}\n{lines}"))
    }

    #[test]
    fn test_normalize_full_row() {
        let rows = modis_rows("13.1231,15.2341,312.5,1.2,1.1,2026-08-20,112,Terra,MODIS,65,6.1NRT,295.2,12.4,D\n");
        let (dets, dropped) = normalize(&rows, MODIS_SCHEMA, "MODIS (Terra+Aqua)");

        assert_eq!(dropped, 0);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.latitude - 13.1231).abs() < 1e-9);
        assert_eq!(d.acq_time, "0112");
        assert!((d.brightness - 312.5).abs() < 1e-9);
        assert_eq!(d.confidence, Some(65.0));
        assert_eq!(d.confidence_raw, "65");
        assert_eq!(d.satellite, "Terra");
        assert_eq!(d.source, "MODIS (Terra+Aqua)");
        assert_eq!(d.frp, Some(12.4));
    }

    #[test]
    fn test_viirs_schema_and_categorical_confidence() {
        let rows = rows_from(&format!(
            "{VIIRS_HEADER}\n12.8,16.2,341.2,0.5,0.5,2026-08-20,1344,N,VIIRS,n,2.0NRT,290.1,8.2,D\n"
        ));
        let (dets, dropped) = normalize(&rows, VIIRS_SCHEMA, "VIIRS (SNPP)");

        assert_eq!(dropped, 0);
        let d = &dets[0];
        assert!((d.brightness - 341.2).abs() < 1e-9);
        assert_eq!(d.confidence, Some(CONFIDENCE_NOMINAL));
        assert_eq!(d.confidence_raw, "n");
        assert_eq!(d.satellite, "N");
    }

    #[test]
    fn test_drops_unparseable_coordinates() {
        let rows = modis_rows(
            "bad_lat,16.0,330.0,1.0,1.0,2026-08-18,910,Terra,MODIS,50,6.1NRT,296.5,13.0,D\n\
             13.0,16.0,331.0,1.0,1.0,2026-08-18,911,Terra,MODIS,51,6.1NRT,296.6,13.1,D\n",
        );
        let (dets, dropped) = normalize(&rows, MODIS_SCHEMA, "MODIS (Terra+Aqua)");
        assert_eq!(dets.len(), 1);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_drops_out_of_range_coordinates() {
        let rows = modis_rows("95.0,16.0,330.0,1.0,1.0,2026-08-18,910,Terra,MODIS,50,6.1NRT,296.5,13.0,D\n");
        let (dets, dropped) = normalize(&rows, MODIS_SCHEMA, "MODIS (Terra+Aqua)");
        assert!(dets.is_empty());
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_drops_missing_date() {
        let rows = modis_rows("13.4,17.5,333.0,1.0,1.0,,917,Aqua,MODIS,52,6.1NRT,296.8,13.5,D\n");
        let (dets, dropped) = normalize(&rows, MODIS_SCHEMA, "MODIS (Terra+Aqua)");
        assert!(dets.is_empty());
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_missing_optionals_degrade() {
        let rows = modis_rows("13.0,16.0,,1.0,1.0,2026-08-18,,,MODIS,,6.1NRT,,,D\n");
        let (dets, dropped) = normalize(&rows, MODIS_SCHEMA, "MODIS (Terra+Aqua)");

        assert_eq!(dropped, 0);
        let d = &dets[0];
        assert!(d.brightness.is_nan());
        assert!(!d.has_brightness());
        assert_eq!(d.confidence, None);
        assert_eq!(d.confidence_raw, "unknown");
        assert_eq!(d.satellite, "unknown_sat");
        assert_eq!(d.acq_time, "");
        assert_eq!(d.frp, None);
    }

    #[test]
    fn test_time_padding() {
        assert_eq!(format_acq_time(Some("112")), "0112");
        assert_eq!(format_acq_time(Some("1305.0")), "1305");
        assert_eq!(format_acq_time(Some("7")), "0007");
        assert_eq!(format_acq_time(Some("abc")), "");
        assert_eq!(format_acq_time(None), "");
    }

    #[test]
    fn test_sample_feed_drop_count() {
        let rows = rows_from(include_str!("../tools/sample_modis_7day.csv"));
        let (dets, dropped) = normalize(&rows, MODIS_SCHEMA, "MODIS (Terra+Aqua)");
        assert_eq!(dets.len(), 16);
        assert_eq!(dropped, 2);
    }
}
