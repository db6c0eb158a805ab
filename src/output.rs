//! Output formatters for detections, fire zones, and the dashboard
//! data file.
//!
//! Terminal output supports human-readable (with colors), JSON, and
//! NDJSON formats. [`build_fire_data`] assembles the `fire_data.json`
//! document the dashboard consumes; its key names and cell formats are
//! a compatibility contract and must not drift.

use std::io::{self, Write};

use serde::Serialize;

use crate::cluster::Intensity;
use crate::models::Detection;
use crate::pipeline::ZoneRecord;
use crate::risk::RiskLevel;
use crate::stats::DashboardStats;

/// Most recent detections carried in the dashboard detail list.
const DETAIL_LIST_LIMIT: usize = 100;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Brightness and confidence colors
const RED: &str = "\x1b[91m"; // Saturated: >= 400 K
const YELLOW: &str = "\x1b[93m"; // Hot: >= 380 K
const CYAN: &str = "\x1b[96m"; // Warm: >= 350 K
const WHITE: &str = "\x1b[97m";

// Intensity tier colors
const TIER_GREEN: &str = "\x1b[42;30m"; // Green background
const TIER_YELLOW: &str = "\x1b[43;30m"; // Yellow background
const TIER_ORANGE: &str = "\x1b[48;5;208;30m"; // Orange background
const TIER_RED: &str = "\x1b[41;97m"; // Red background

const ICON_FIRE: &str = "🔥";
const ICON_ALERT: &str = "⚠️";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Flattened detection for JSON output.
#[derive(Debug, Serialize)]
pub struct OutputDetection {
    pub latitude: f64,
    pub longitude: f64,
    pub acq_date: String,
    pub acq_time: String,
    pub brightness: Option<f64>,
    pub confidence: Option<f64>,
    pub confidence_raw: String,
    pub satellite: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frp: Option<f64>,
}

impl From<&Detection> for OutputDetection {
    fn from(d: &Detection) -> Self {
        Self {
            latitude: d.latitude,
            longitude: d.longitude,
            acq_date: d.acq_date.to_string(),
            acq_time: d.acq_time.clone(),
            brightness: d.has_brightness().then_some(d.brightness),
            confidence: d.confidence,
            confidence_raw: d.confidence_raw.clone(),
            satellite: d.satellite.clone(),
            source: d.source.clone(),
            frp: d.frp,
        }
    }
}

/// Get the color code for a brightness value.
fn brightness_color(brightness: f64) -> &'static str {
    match brightness {
        b if b >= 400.0 => RED,
        b if b >= 380.0 => YELLOW,
        b if b >= 350.0 => CYAN,
        _ => WHITE,
    }
}

/// Get the color code for a confidence value.
fn confidence_color(confidence: Option<f64>) -> &'static str {
    match confidence {
        Some(c) if c > 79.0 => RED,
        Some(c) if c >= 30.0 => YELLOW,
        Some(_) => DIM,
        None => WHITE,
    }
}

/// Format an intensity tier with a background block.
fn format_intensity(intensity: Intensity) -> String {
    match intensity {
        Intensity::Extreme => format!("{TIER_RED} EXTREME {RESET}"),
        Intensity::High => format!("{TIER_ORANGE} HIGH {RESET}"),
        Intensity::Moderate => format!("{TIER_YELLOW} MODERATE {RESET}"),
        Intensity::Low => format!("{TIER_GREEN} LOW {RESET}"),
    }
}

fn risk_color(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Critical => RED,
        RiskLevel::VeryHigh => YELLOW,
        RiskLevel::High => CYAN,
        RiskLevel::Moderate | RiskLevel::Low => WHITE,
        RiskLevel::Unknown => DIM,
    }
}

fn fmt_kelvin(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.1}")
    } else {
        "?".into()
    }
}

fn fmt_clock(acq_time: &str) -> String {
    if acq_time.len() >= 4 && acq_time.is_ascii() {
        format!("{}:{}", &acq_time[..2], &acq_time[2..])
    } else {
        "--:--".into()
    }
}

/// Write detections in human-readable format with rich colors.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, detections: &[Detection]) -> io::Result<()> {
    for d in detections {
        let color = brightness_color(d.brightness);
        let conf_color = confidence_color(d.confidence);
        let bright = fmt_kelvin(d.brightness);
        let clock = fmt_clock(&d.acq_time);

        writeln!(
            writer,
            "{ICON_FIRE} {color}{BOLD}{bright:>6} K{RESET} │ \
             {conf_color}{conf:>7}{RESET} │ \
             {date} {clock} │ \
             {DIM}{lat:>8.4}, {lon:>9.4}{RESET} │ \
             {sat:<5} {DIM}{source}{RESET}",
            conf = d.confidence_raw,
            date = d.acq_date,
            lat = d.latitude,
            lon = d.longitude,
            sat = d.satellite,
            source = d.source,
        )?;
    }
    Ok(())
}

/// Write detections as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, detections: &[Detection]) -> io::Result<()> {
    let output: Vec<OutputDetection> = detections.iter().map(OutputDetection::from).collect();
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write detections as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, detections: &[Detection]) -> io::Result<()> {
    for d in detections {
        let output = OutputDetection::from(d);
        let json = serde_json::to_string(&output)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write detections in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_detections<W: Write>(
    writer: &mut W,
    detections: &[Detection],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, detections),
        Format::Json => write_json(writer, detections),
        Format::Ndjson => write_ndjson(writer, detections),
    }
}

/// Write fire zones in human-readable format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_zones_human<W: Write>(writer: &mut W, zones: &[ZoneRecord]) -> io::Result<()> {
    for zone in zones {
        let tier = format_intensity(zone.intensity);
        let conf = if zone.avg_confidence.is_finite() {
            format!("{:.0}%", zone.avg_confidence)
        } else {
            "?".into()
        };

        let mut extras = String::new();
        if let Some(province) = &zone.province {
            extras.push_str(&format!(" │ {province}"));
            if let Some(department) = &zone.department {
                extras.push_str(&format!(" / {department}"));
            }
        }
        if let Some(weather) = &zone.weather {
            extras.push_str(&format!(
                " │ {}, {:.0}°C, {:.0}% RH",
                weather.description, weather.temp_c, weather.humidity_pct
            ));
        }
        if let Some(risk) = &zone.risk {
            let color = risk_color(risk.level);
            let alert = if risk.level == RiskLevel::Critical {
                format!(" {ICON_ALERT}")
            } else {
                String::new()
            };
            extras.push_str(&format!(
                " │ risk {color}{BOLD}{}/100 {}{RESET}{alert}",
                risk.score,
                risk.level.as_str()
            ));
        }

        writeln!(
            writer,
            "{ICON_FIRE} {tier} │ {count:>3} fires │ \
             {DIM}{lat:>7.3}, {lon:>8.3}{RESET} │ \
             avg {avg:>5} K │ max {max:>5} K │ conf {conf}{extras}",
            count = zone.count,
            lat = zone.centroid_lat,
            lon = zone.centroid_lon,
            avg = fmt_kelvin(zone.avg_brightness),
            max = fmt_kelvin(zone.max_brightness),
        )?;
    }
    Ok(())
}

/// Write fire zones in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_zones<W: Write>(writer: &mut W, zones: &[ZoneRecord], format: Format) -> io::Result<()> {
    match format {
        Format::Human => write_zones_human(writer, zones),
        Format::Json => {
            let json = serde_json::to_string_pretty(zones)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writeln!(writer, "{json}")
        }
        Format::Ndjson => {
            for zone in zones {
                let json = serde_json::to_string(zone)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                writeln!(writer, "{json}")?;
            }
            Ok(())
        }
    }
}

/// Filter settings echoed into `fire_data.json` so the dashboard can
/// show what produced the data.
#[derive(Debug, Clone, Serialize)]
pub struct FiltersEcho {
    pub days: u32,
    pub geographic_bounds: String,
    pub min_confidence: f64,
    pub min_brightness: f64,
    pub sources: Vec<String>,
    /// ISO 8601 timestamp of the run.
    pub last_update: String,
}

/// Dashboard detail-list entry.
#[derive(Debug, Serialize)]
pub struct DetailEntry {
    pub date: String,
    pub time: String,
    /// `"lat, lon"` at 2 decimals.
    pub location: String,
    /// Confidence as the feed reported it.
    pub confidence: String,
}

/// The `fire_data.json` document.
#[derive(Debug, Serialize)]
pub struct FireDataDoc {
    pub stats: DashboardStats,
    #[serde(rename = "detailList")]
    pub detail_list: Vec<DetailEntry>,
    #[serde(rename = "fireRecords")]
    pub fire_records: Vec<[String; 7]>,
    pub filters: FiltersEcho,
}

/// Assemble the dashboard document from processed detections.
///
/// Detections are ordered most recent first. The detail list carries at
/// most [`DETAIL_LIST_LIMIT`] entries; fire records carry every
/// detection as a 7-cell display row with `"-"` placeholders for
/// missing values.
#[must_use]
pub fn build_fire_data(
    detections: &[Detection],
    stats: DashboardStats,
    filters: FiltersEcho,
) -> FireDataDoc {
    let mut order: Vec<&Detection> = detections.iter().collect();
    order.sort_by(|a, b| {
        (b.acq_date, b.acq_time.as_str()).cmp(&(a.acq_date, a.acq_time.as_str()))
    });

    let detail_list = order
        .iter()
        .take(DETAIL_LIST_LIMIT)
        .map(|d| DetailEntry {
            date: d.acq_date.to_string(),
            time: d.acq_time.clone(),
            location: d.location_label(),
            confidence: d.confidence_raw.clone(),
        })
        .collect();

    let fire_records = order.iter().map(|d| fire_record(d)).collect();

    FireDataDoc {
        stats,
        detail_list,
        fire_records,
        filters,
    }
}

/// One display row for the dashboard table.
fn fire_record(d: &Detection) -> [String; 7] {
    let time = if d.acq_time.is_empty() {
        "-".into()
    } else {
        d.acq_time.clone()
    };
    let brightness = if d.has_brightness() {
        format!(
            "{:.1} K <span class='fire-emoji' data-brightness='{}'>🔥</span>",
            d.brightness, d.brightness
        )
    } else {
        "-".into()
    };

    [
        d.acq_date.to_string(),
        time,
        format!("{:.4}", d.latitude),
        format!("{:.4}", d.longitude),
        brightness,
        d.confidence_raw.clone(),
        d.satellite.clone(),
    ]
}

/// Write the dashboard document, pretty-printed.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_fire_data<W: Write>(writer: &mut W, doc: &FireDataDoc) -> io::Result<()> {
    let json = serde_json::to_string_pretty(doc)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats;
    use chrono::NaiveDate;

    fn detection(date: &str, time: &str, lat: f64, lon: f64, brightness: f64) -> Detection {
        Detection {
            latitude: lat,
            longitude: lon,
            acq_date: date.parse::<NaiveDate>().unwrap(),
            acq_time: time.to_string(),
            brightness,
            confidence: Some(85.0),
            confidence_raw: "85".to_string(),
            satellite: "Terra".to_string(),
            source: "MODIS (Terra+Aqua)".to_string(),
            frp: Some(12.4),
            scan: None,
            track: None,
        }
    }

    fn echo() -> FiltersEcho {
        FiltersEcho {
            days: 7,
            geographic_bounds: "Chad (7.0-23.5°N, 13.5-24.0°E)".to_string(),
            min_confidence: 30.0,
            min_brightness: 300.0,
            sources: vec!["MODIS (Terra+Aqua)".to_string()],
            last_update: "2026-08-25T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_detail_list_most_recent_first() {
        let detections = vec![
            detection("2026-08-16", "0930", 13.0, 15.0, 320.0),
            detection("2026-08-22", "0142", 13.1, 15.1, 330.0),
            detection("2026-08-22", "2330", 13.2, 15.2, 340.0),
            detection("2026-08-20", "1200", 13.3, 15.3, 350.0),
        ];
        let doc = build_fire_data(&detections, stats::compute(&detections), echo());

        let dates: Vec<&str> = doc.detail_list.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(
            dates,
            vec!["2026-08-22", "2026-08-22", "2026-08-20", "2026-08-16"]
        );
        assert_eq!(doc.detail_list[0].time, "2330");
        assert_eq!(doc.detail_list[0].location, "13.20, 15.20");
    }

    #[test]
    fn test_detail_list_capped_but_records_complete() {
        let detections: Vec<Detection> = (0..105)
            .map(|i| {
                detection(
                    "2026-08-20",
                    &format!("{i:04}"),
                    10.0 + f64::from(i) * 0.01,
                    20.0,
                    330.0,
                )
            })
            .collect();
        let doc = build_fire_data(&detections, stats::compute(&detections), echo());

        assert_eq!(doc.detail_list.len(), 100);
        assert_eq!(doc.fire_records.len(), 105);
    }

    #[test]
    fn test_fire_record_cells() {
        let mut d = detection("2026-08-20", "0142", 13.1231, 15.2341, 338.48);
        d.confidence_raw = "nominal".to_string();
        let record = fire_record(&d);

        assert_eq!(record[0], "2026-08-20");
        assert_eq!(record[1], "0142");
        assert_eq!(record[2], "13.1231");
        assert_eq!(record[3], "15.2341");
        assert_eq!(
            record[4],
            "338.5 K <span class='fire-emoji' data-brightness='338.48'>🔥</span>"
        );
        assert_eq!(record[5], "nominal");
        assert_eq!(record[6], "Terra");
    }

    #[test]
    fn test_fire_record_placeholders() {
        let d = detection("2026-08-20", "", 13.0, 15.0, f64::NAN);
        let record = fire_record(&d);

        assert_eq!(record[1], "-");
        assert_eq!(record[4], "-");
    }

    #[test]
    fn test_fire_data_key_names() {
        let detections = vec![detection("2026-08-20", "0142", 13.0, 15.0, 330.0)];
        let doc = build_fire_data(&detections, stats::compute(&detections), echo());
        let value = serde_json::to_value(&doc).unwrap();

        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("stats"));
        assert!(obj.contains_key("detailList"));
        assert!(obj.contains_key("fireRecords"));
        assert!(obj.contains_key("filters"));
        assert_eq!(obj["filters"]["days"], 7);
        assert_eq!(obj["filters"]["last_update"], "2026-08-25T12:00:00Z");
    }

    #[test]
    fn test_write_human_mentions_satellite() {
        let detections = vec![detection("2026-08-20", "0142", 13.0, 15.0, 330.0)];
        let mut buf = Vec::new();
        write_human(&mut buf, &detections).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("Terra"));
        assert!(text.contains("2026-08-20 01:42"));
    }

    #[test]
    fn test_write_ndjson_one_line_per_detection() {
        let detections = vec![
            detection("2026-08-20", "0142", 13.0, 15.0, 330.0),
            detection("2026-08-21", "0300", 13.1, 15.1, f64::NAN),
        ];
        let mut buf = Vec::new();
        write_ndjson(&mut buf, &detections).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert!(second["brightness"].is_null());
    }
}
