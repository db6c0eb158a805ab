//! The detection pipeline.
//!
//! One parameterized flow from raw feed rows to filtered detections,
//! fire zones, and dashboard statistics: acquire, normalize, filter,
//! dedup, cluster, then optional weather-driven risk per zone. Every
//! stage reports its counts so a run can explain where rows went.

use serde::Serialize;
use tracing::info;

use crate::admin::AdminAtlas;
use crate::cluster::{ClusterParams, FireZone, Intensity, build_zones};
use crate::dedup::dedup_detections;
use crate::errors::FiresiftError;
use crate::filters::{FilterChain, StageReport};
use crate::models::Detection;
use crate::normalize::normalize;
use crate::risk::{self, RiskAssessment, WeatherObservation};
use crate::source::DataSource;
use crate::stats::{self, DashboardStats};
use crate::weather::WeatherProvider;

/// Counts of what each stage did, for the run summary.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    /// Raw rows fetched per source label, in fetch order.
    pub source_rows: Vec<(String, usize)>,
    /// Rows dropped during normalization.
    pub dropped_rows: usize,
    /// Filter chain stage counts.
    pub stages: Vec<StageReport>,
    /// Duplicate detections removed.
    pub duplicates: usize,
    /// Fire zones kept.
    pub zones: usize,
    /// Detections DBSCAN labeled as noise.
    pub noise: usize,
    /// Clusters below the zone member minimum.
    pub skipped_small: usize,
    /// Clusters whose hull collapsed to a point or line.
    pub skipped_degenerate: usize,
}

impl RunReport {
    /// Emit the run summary at info level.
    pub fn log_summary(&self) {
        for (source, rows) in &self.source_rows {
            info!(source = %source, rows, "source rows");
        }
        info!(dropped = self.dropped_rows, "rows dropped by normalization");
        for stage in &self.stages {
            info!(
                stage = stage.stage,
                before = stage.before,
                after = stage.after,
                "filter stage"
            );
        }
        info!(duplicates = self.duplicates, "duplicates removed");
        info!(
            zones = self.zones,
            noise = self.noise,
            skipped_small = self.skipped_small,
            skipped_degenerate = self.skipped_degenerate,
            "clustering outcome"
        );
    }
}

/// One fire zone prepared for output, with optional enrichments.
#[derive(Debug, Serialize)]
pub struct ZoneRecord {
    pub id: usize,
    pub count: usize,
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub avg_brightness: f64,
    pub max_brightness: f64,
    pub avg_confidence: f64,
    pub intensity: Intensity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherObservation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
    /// Buffered hull ring as `(lat, lon)` vertices.
    pub boundary: Vec<(f64, f64)>,
}

impl ZoneRecord {
    /// Bare record from cluster output; enrichments start empty.
    #[must_use]
    pub fn from_zone(id: usize, zone: &FireZone) -> Self {
        Self {
            id,
            count: zone.count,
            centroid_lat: zone.centroid.0,
            centroid_lon: zone.centroid.1,
            avg_brightness: zone.avg_brightness,
            max_brightness: zone.max_brightness,
            avg_confidence: zone.avg_confidence,
            intensity: zone.intensity,
            province: None,
            department: None,
            weather: None,
            risk: None,
            boundary: zone.boundary.clone(),
        }
    }
}

/// Everything a full run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Filtered, deduplicated detections in feed order.
    pub detections: Vec<Detection>,
    /// Fire zones with their enrichments.
    pub zones: Vec<ZoneRecord>,
    pub stats: DashboardStats,
    pub report: RunReport,
}

/// Fetch, normalize, filter, and dedup detections.
///
/// This is the shared front half of every command; clustering and risk
/// build on its output. An empty result is not an error: the caller
/// decides whether to suggest loosening the filters.
///
/// # Errors
///
/// Returns an error when acquisition fails entirely.
pub fn collect(
    source: &DataSource,
    chain: &FilterChain,
) -> Result<(Vec<Detection>, RunReport), FiresiftError> {
    let batches = source.acquire()?;

    let mut report = RunReport::default();
    let mut detections = Vec::new();
    for batch in &batches {
        let label = batch.product.label();
        report.source_rows.push((label.to_string(), batch.rows.len()));

        let (mut normalized, dropped) = normalize(&batch.rows, batch.product.schema(), label);
        report.dropped_rows += dropped;
        detections.append(&mut normalized);
    }
    info!(
        rows = detections.len(),
        dropped = report.dropped_rows,
        "normalized detections"
    );

    let (detections, stages) = chain.apply(detections);
    report.stages = stages;

    let (detections, duplicates) = dedup_detections(detections);
    report.duplicates = duplicates;
    info!(detections = detections.len(), duplicates, "filtered and deduplicated");

    Ok((detections, report))
}

/// Run the full pipeline.
///
/// Zones pick up province and department names from the atlas, and a
/// risk assessment when a weather provider is given. A provider that
/// fails to observe still yields an assessment, scored as unknown.
///
/// # Errors
///
/// Returns an error when acquisition fails entirely.
pub fn run(
    source: &DataSource,
    chain: &FilterChain,
    params: &ClusterParams,
    atlas: &AdminAtlas,
    mut weather: Option<&mut dyn WeatherProvider>,
) -> Result<PipelineOutput, FiresiftError> {
    let (detections, mut report) = collect(source, chain)?;

    let outcome = build_zones(&detections, params);
    report.zones = outcome.zones.len();
    report.noise = outcome.noise;
    report.skipped_small = outcome.skipped_small;
    report.skipped_degenerate = outcome.skipped_degenerate;

    let stats = stats::compute(&detections);

    let mut zones = Vec::with_capacity(outcome.zones.len());
    for (id, zone) in outcome.zones.iter().enumerate() {
        let mut record = ZoneRecord::from_zone(id, zone);

        let (lat, lon) = zone.centroid;
        let (province, department) = atlas.locate(lat, lon);
        record.province = province.map(str::to_string);
        record.department = department.map(str::to_string);

        if let Some(provider) = weather.as_mut() {
            let observation = provider.observe(lat, lon);
            record.risk = Some(risk::assess(
                observation.as_ref(),
                zone.avg_brightness,
                zone.avg_confidence,
            ));
            record.weather = observation;
        }

        zones.push(record);
    }
    info!(zones = zones.len(), noise = outcome.noise, "zones built");

    Ok(PipelineOutput {
        detections,
        zones,
        stats,
        report,
    })
}
