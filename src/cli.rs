//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::Format;

/// NASA FIRMS wildfire monitoring for Chad from your terminal.
#[derive(Parser, Debug)]
#[command(name = "firesift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show filtered fire detections (one-shot fetch and exit)
    Scan(ScanArgs),

    /// Cluster detections into fire zones with optional risk scoring
    Zones(ZonesArgs),

    /// Write the dashboard data file (fire_data.json)
    Report(ReportArgs),
}

/// Fetch and filter options shared by every command.
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// FIRMS API key (falls back to the config file, then FIRMS_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Path to a filters config JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Days of the NRT archive to fetch (1-10)
    #[arg(long)]
    pub days: Option<u32>,

    /// Minimum confidence to keep (0-100, 0 disables)
    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Minimum brightness in Kelvin to keep (0 disables)
    #[arg(long)]
    pub min_brightness: Option<f64>,

    /// Restrict to named regions, comma separated (e.g. Lac,Salamat)
    #[arg(long, value_delimiter = ',')]
    pub regions: Option<Vec<String>>,

    /// Restrict to the configured region list
    #[arg(long)]
    pub use_regions: bool,

    /// Fetch VIIRS (SNPP + NOAA-20) in addition to MODIS
    #[arg(long, conflicts_with = "modis_only")]
    pub multi_source: bool,

    /// Fetch only the MODIS feed
    #[arg(long)]
    pub modis_only: bool,

    /// Read detections from a saved CSV instead of the API
    #[arg(long)]
    pub fixture: Option<PathBuf>,
}

/// Arguments for the `scan` command.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Maximum number of detections to show
    #[arg(long, short = 'n', default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `zones` command.
#[derive(Parser, Debug)]
pub struct ZonesArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// DBSCAN neighborhood radius in degrees
    #[arg(long, default_value = "0.05")]
    pub eps: f64,

    /// DBSCAN minimum points per neighborhood (self included)
    #[arg(long, default_value = "2")]
    pub min_samples: usize,

    /// OpenWeather API key for risk scoring (or OPENWEATHER_API_KEY)
    #[arg(long)]
    pub weather_key: Option<String>,

    /// GADM level-1 GeoJSON for province labels
    #[arg(long)]
    pub provinces: Option<PathBuf>,

    /// GADM level-2 GeoJSON for department labels
    #[arg(long)]
    pub departments: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `report` command.
#[derive(Parser, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Output path for the dashboard data file
    #[arg(long, short = 'o', default_value = "fire_data.json")]
    pub out: PathBuf,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
