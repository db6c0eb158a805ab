//! FireSift - NASA FIRMS wildfire monitoring for Chad from your terminal.
//!
//! A terminal-first, pipe-friendly CLI that fetches FIRMS fire
//! detections, filters them to Chad, clusters them into fire zones,
//! and writes the data file the fire dashboard consumes.

use std::fs::File;
use std::io::{self, BufWriter};
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use tracing::{error, info, warn};

mod admin;
mod cli;
mod client;
mod cluster;
mod config;
mod dedup;
mod errors;
mod filters;
mod models;
mod normalize;
mod output;
mod pipeline;
mod risk;
mod source;
mod stats;
mod weather;

use cli::{Cli, Command, FetchArgs};
use client::{FirmsClient, FirmsProduct};
use cluster::ClusterParams;
use config::{CountryProfile, FileConfig, FilterConfig};
use filters::FilterChain;
use source::DataSource;
use weather::{OpenWeatherClient, WeatherCache, WeatherProvider};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Scan(args) => cmd_scan(args),
        Command::Zones(args) => cmd_zones(args),
        Command::Report(args) => cmd_report(args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Merge defaults, config file, and flags into the effective filter
/// settings. Flags win over the file; the file wins over defaults.
/// Also returns the API key from the file, if any.
fn resolve_config(args: &FetchArgs) -> Result<(FilterConfig, Option<String>)> {
    let mut config = FilterConfig::default();
    let mut file_key = None;

    if let Some(path) = &args.config {
        let file = FileConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        file_key = file.api_key.clone();
        config.merge_file(&file);
    }

    if let Some(days) = args.days {
        config.days = days;
    }
    if let Some(v) = args.min_confidence {
        config.min_confidence = v;
    }
    if let Some(v) = args.min_brightness {
        config.min_brightness = v;
    }
    if let Some(regions) = &args.regions {
        config.regions = regions.clone();
        config.use_regions = true;
    }
    if args.use_regions {
        config.use_regions = true;
    }
    if args.modis_only {
        config.multi_source = false;
    } else if args.multi_source {
        config.multi_source = true;
    }

    config.validate()?;
    Ok((config, file_key))
}

/// FIRMS key resolution: flag, then config file, then environment.
fn resolve_api_key(flag: Option<&str>, file_key: Option<&str>) -> Result<String> {
    if let Some(key) = flag {
        return Ok(key.to_string());
    }
    if let Some(key) = file_key {
        return Ok(key.to_string());
    }
    std::env::var("FIRMS_API_KEY").context(
        "no FIRMS API key: pass --api-key, set api_key in the config file, \
         or export FIRMS_API_KEY",
    )
}

/// Products the run will fetch.
fn products_for(config: &FilterConfig) -> Vec<FirmsProduct> {
    if config.multi_source {
        FirmsProduct::ALL.to_vec()
    } else {
        vec![FirmsProduct::ModisNrt]
    }
}

/// Build the data source: a fixture file when given, the live API
/// otherwise.
fn build_source(
    args: &FetchArgs,
    config: &FilterConfig,
    file_key: Option<&str>,
    profile: &CountryProfile,
) -> Result<DataSource> {
    if let Some(path) = &args.fixture {
        return Ok(DataSource::fixture(path));
    }

    let key = resolve_api_key(args.api_key.as_deref(), file_key)?;
    let client = FirmsClient::new(key).context("failed to create FIRMS client")?;
    Ok(DataSource::live(
        client,
        products_for(config),
        profile.code,
        config.clamped_days(),
    ))
}

/// Suggest looser settings when everything was filtered out.
fn warn_empty(config: &FilterConfig) {
    warn!(
        days = config.days,
        min_confidence = config.min_confidence,
        min_brightness = config.min_brightness,
        "no detections left after filtering; try more days, a lower \
         min-confidence or min-brightness, or a wider area"
    );
}

/// Execute the `scan` command - one-shot fetch of filtered detections.
fn cmd_scan(args: cli::ScanArgs) -> Result<()> {
    let profile = CountryProfile::chad();
    let (config, file_key) = resolve_config(&args.fetch)?;
    let chain = FilterChain::from_config(&config, &profile)?;
    let source = build_source(&args.fetch, &config, file_key.as_deref(), &profile)?;

    let (mut detections, report) = pipeline::collect(&source, &chain)?;
    report.log_summary();
    if detections.is_empty() {
        warn_empty(&config);
    }

    // Sort by acquisition time descending (most recent first)
    detections.sort_by(|a, b| {
        (b.acq_date, b.acq_time.as_str()).cmp(&(a.acq_date, a.acq_time.as_str()))
    });
    detections.truncate(args.limit);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_detections(&mut handle, &detections, args.format)?;

    Ok(())
}

/// Execute the `zones` command - cluster detections into fire zones.
fn cmd_zones(args: cli::ZonesArgs) -> Result<()> {
    let profile = CountryProfile::chad();
    let (config, file_key) = resolve_config(&args.fetch)?;
    let chain = FilterChain::from_config(&config, &profile)?;
    let source = build_source(&args.fetch, &config, file_key.as_deref(), &profile)?;

    let atlas = admin::AdminAtlas::load(args.provinces.as_deref(), args.departments.as_deref())?;
    let params = ClusterParams {
        eps_deg: args.eps,
        min_samples: args.min_samples.max(1),
    };

    // Risk scoring is opt-in: it needs an OpenWeather key.
    let weather_key = args
        .weather_key
        .clone()
        .or_else(|| std::env::var("OPENWEATHER_API_KEY").ok());
    let mut cache = match weather_key {
        Some(key) => Some(WeatherCache::new(
            OpenWeatherClient::new(key).context("failed to create weather client")?,
        )),
        None => None,
    };
    let provider = cache.as_mut().map(|c| c as &mut dyn WeatherProvider);

    let out = pipeline::run(&source, &chain, &params, &atlas, provider)?;
    out.report.log_summary();
    if out.detections.is_empty() {
        warn_empty(&config);
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_zones(&mut handle, &out.zones, args.format)?;

    Ok(())
}

/// Execute the `report` command - write the dashboard data file.
fn cmd_report(args: cli::ReportArgs) -> Result<()> {
    let profile = CountryProfile::chad();
    let (config, file_key) = resolve_config(&args.fetch)?;
    let chain = FilterChain::from_config(&config, &profile)?;
    let source = build_source(&args.fetch, &config, file_key.as_deref(), &profile)?;

    let out = pipeline::run(
        &source,
        &chain,
        &ClusterParams::default(),
        &admin::AdminAtlas::default(),
        None,
    )?;
    out.report.log_summary();
    if out.detections.is_empty() {
        warn_empty(&config);
    }

    let (center_lat, center_lon) = stats::map_center(&out.detections, profile.fallback_center);
    info!(lat = center_lat, lon = center_lon, "map center");
    for (region, count) in stats::region_breakdown(&out.detections, profile.regions()) {
        info!(region = %region, count, "detections in region");
    }

    let echo = output::FiltersEcho {
        days: config.clamped_days(),
        geographic_bounds: chain.area.describe(),
        min_confidence: config.min_confidence,
        min_brightness: config.min_brightness,
        sources: products_for(&config)
            .iter()
            .map(|p| p.label().to_string())
            .collect(),
        last_update: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    let doc = output::build_fire_data(&out.detections, out.stats, echo);

    let file = File::create(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let mut writer = BufWriter::new(file);
    output::write_fire_data(&mut writer, &doc)?;

    info!(
        path = %args.out.display(),
        detections = doc.stats.total_detections,
        zones = out.zones.len(),
        "dashboard data written"
    );

    Ok(())
}
