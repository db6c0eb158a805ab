//! Spatial clustering of detections into fire zones.
//!
//! DBSCAN over raw degree coordinates (flat 2D, no projection) groups
//! nearby detections; each cluster with enough members gets a buffered
//! convex-hull boundary. Noise points stay out of zones but remain in
//! the detection set for global statistics.

use std::collections::BTreeMap;

use geo::{ConvexHull, MultiPoint, Point};
use serde::Serialize;
use tracing::warn;

use crate::models::Detection;

/// Default neighborhood radius in degrees (~5.5 km at the equator).
pub const DEFAULT_EPS_DEG: f64 = 0.05;

/// Default minimum neighborhood size, the point itself included.
pub const DEFAULT_MIN_SAMPLES: usize = 2;

/// A cluster needs this many members before a boundary is drawn.
const MIN_ZONE_MEMBERS: usize = 3;

/// Hull vertices are pushed away from their mean by this factor.
const BUFFER_FACTOR: f64 = 1.2;

/// DBSCAN tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct ClusterParams {
    /// Neighborhood radius in degrees. 0.05 is fine-grained; 0.5 merges
    /// whole fire complexes.
    pub eps_deg: f64,
    /// Minimum points per neighborhood, the point itself included.
    pub min_samples: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            eps_deg: DEFAULT_EPS_DEG,
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }
}

/// Zone intensity tier, from cluster aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Moderate,
    High,
    Extreme,
}

impl Intensity {
    /// Classify from average brightness (Kelvin) and average confidence.
    /// NaN aggregates fail every comparison and land on `Low`.
    #[must_use]
    pub fn from_aggregates(avg_brightness: f64, avg_confidence: f64) -> Self {
        if avg_brightness > 400.0 || avg_confidence > 90.0 {
            Self::Extreme
        } else if avg_brightness > 380.0 || avg_confidence > 80.0 {
            Self::High
        } else if avg_brightness > 350.0 || avg_confidence > 70.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Lowercase label for output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }
}

/// A clustered fire zone with a buffered boundary polygon.
#[derive(Debug, Clone, Serialize)]
pub struct FireZone {
    /// Indices into the detection slice the zone was built from.
    pub members: Vec<usize>,

    /// Buffered hull ring as `(lat, lon)` vertices, not closed.
    pub boundary: Vec<(f64, f64)>,

    /// Mean of the unbuffered hull vertices.
    pub centroid: (f64, f64),

    pub count: usize,
    pub avg_brightness: f64,
    pub max_brightness: f64,
    pub avg_confidence: f64,
    pub intensity: Intensity,
}

/// What clustering did with the detection set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterOutcome {
    pub zones: Vec<FireZone>,
    /// Detections DBSCAN labeled as noise.
    pub noise: usize,
    /// Clusters below the zone member minimum.
    pub skipped_small: usize,
    /// Clusters whose hull collapsed to a point or line.
    pub skipped_degenerate: usize,
}

/// Label each point with its cluster, `None` for noise.
///
/// Classic DBSCAN: a point is core when its eps-neighborhood (itself
/// included) holds at least `min_samples` points; clusters grow from
/// core points, border points join the first cluster that reaches them.
#[must_use]
pub fn dbscan(points: &[(f64, f64)], eps: f64, min_samples: usize) -> Vec<Option<usize>> {
    let mut visited = vec![false; points.len()];
    let mut labels = vec![None::<usize>; points.len()];
    let mut next_label = 0usize;

    for i in 0..points.len() {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let neighbors = region_query(points, i, eps);
        if neighbors.len() < min_samples {
            continue; // noise unless a cluster absorbs it later
        }

        let label = next_label;
        next_label += 1;
        labels[i] = Some(label);

        let mut queue = neighbors;
        while let Some(j) = queue.pop() {
            if !visited[j] {
                visited[j] = true;
                let j_neighbors = region_query(points, j, eps);
                if j_neighbors.len() >= min_samples {
                    queue.extend(j_neighbors);
                }
            }
            if labels[j].is_none() {
                labels[j] = Some(label);
            }
        }
    }

    labels
}

/// Indices within `eps` of point `i`, the point itself included.
fn region_query(points: &[(f64, f64)], i: usize, eps: f64) -> Vec<usize> {
    let (lat_i, lon_i) = points[i];
    points
        .iter()
        .enumerate()
        .filter(|(_, (lat, lon))| {
            let dlat = lat - lat_i;
            let dlon = lon - lon_i;
            (dlat * dlat + dlon * dlon).sqrt() <= eps
        })
        .map(|(j, _)| j)
        .collect()
}

/// Cluster detections and build zones for every cluster that supports a
/// boundary polygon.
#[must_use]
pub fn build_zones(detections: &[Detection], params: &ClusterParams) -> ClusterOutcome {
    let points: Vec<(f64, f64)> = detections
        .iter()
        .map(|d| (d.latitude, d.longitude))
        .collect();
    let labels = dbscan(&points, params.eps_deg, params.min_samples);

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut outcome = ClusterOutcome::default();
    for (i, label) in labels.iter().enumerate() {
        match label {
            Some(id) => groups.entry(*id).or_default().push(i),
            None => outcome.noise += 1,
        }
    }

    for (label, members) in groups {
        if members.len() < MIN_ZONE_MEMBERS {
            outcome.skipped_small += 1;
            continue;
        }
        match hull_boundary(detections, &members) {
            Some((boundary, centroid)) => {
                outcome.zones.push(make_zone(detections, members, boundary, centroid));
            }
            None => {
                warn!(
                    cluster = label,
                    size = members.len(),
                    "degenerate cluster geometry, skipping zone"
                );
                outcome.skipped_degenerate += 1;
            }
        }
    }

    outcome
}

/// Convex hull of the member positions, buffered outward.
///
/// Returns `None` when the hull collapses below a triangle (identical
/// or collinear positions).
fn hull_boundary(
    detections: &[Detection],
    members: &[usize],
) -> Option<(Vec<(f64, f64)>, (f64, f64))> {
    let multi: MultiPoint<f64> = members
        .iter()
        .map(|&i| Point::new(detections[i].longitude, detections[i].latitude))
        .collect();
    let hull = multi.convex_hull();

    // geo uses x=lon, y=lat; flip back to (lat, lon).
    let mut vertices: Vec<(f64, f64)> = hull.exterior().coords().map(|c| (c.y, c.x)).collect();
    if vertices.len() >= 2 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices.dedup();
    if vertices.len() < 3 || ring_area(&vertices) <= 0.0 {
        return None;
    }

    let n = vertices.len() as f64;
    let center_lat = vertices.iter().map(|(lat, _)| lat).sum::<f64>() / n;
    let center_lon = vertices.iter().map(|(_, lon)| lon).sum::<f64>() / n;

    let boundary = vertices
        .iter()
        .map(|(lat, lon)| {
            (
                center_lat + (lat - center_lat) * BUFFER_FACTOR,
                center_lon + (lon - center_lon) * BUFFER_FACTOR,
            )
        })
        .collect();

    Some((boundary, (center_lat, center_lon)))
}

/// Shoelace area of an unclosed ring, in squared degrees.
fn ring_area(vertices: &[(f64, f64)]) -> f64 {
    let n = vertices.len();
    let mut sum = 0.0;
    for k in 0..n {
        let (y1, x1) = vertices[k];
        let (y2, x2) = vertices[(k + 1) % n];
        sum += x1 * y2 - x2 * y1;
    }
    (sum / 2.0).abs()
}

fn make_zone(
    detections: &[Detection],
    members: Vec<usize>,
    boundary: Vec<(f64, f64)>,
    centroid: (f64, f64),
) -> FireZone {
    let avg_brightness = mean_finite(members.iter().map(|&i| detections[i].brightness));
    let max_brightness = members
        .iter()
        .map(|&i| detections[i].brightness)
        .fold(f64::NAN, f64::max);
    let avg_confidence = mean_finite(
        members
            .iter()
            .filter_map(|&i| detections[i].confidence),
    );

    FireZone {
        count: members.len(),
        intensity: Intensity::from_aggregates(avg_brightness, avg_confidence),
        members,
        boundary,
        centroid,
        avg_brightness,
        max_brightness,
        avg_confidence,
    }
}

/// Mean over finite values; NaN when none are finite.
fn mean_finite(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        if v.is_finite() {
            sum += v;
            n += 1;
        }
    }
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn det(lat: f64, lon: f64, brightness: f64, confidence: Option<f64>) -> Detection {
        Detection {
            latitude: lat,
            longitude: lon,
            acq_date: NaiveDate::from_ymd_opt(2026, 8, 21).unwrap(),
            acq_time: "1205".into(),
            brightness,
            confidence,
            confidence_raw: confidence.map_or_else(|| "unknown".into(), |c| format!("{c}")),
            satellite: "Terra".into(),
            source: "MODIS (Terra+Aqua)".into(),
            frp: None,
            scan: None,
            track: None,
        }
    }

    fn dense_five() -> Vec<Detection> {
        vec![
            det(10.51, 20.51, 352.1, Some(78.0)),
            det(10.52, 20.53, 361.0, Some(81.0)),
            det(10.54, 20.52, 345.7, Some(69.0)),
            det(10.53, 20.55, 402.3, Some(88.0)),
            det(10.55, 20.54, 371.8, Some(83.0)),
        ]
    }

    #[test]
    fn test_cluster_with_isolated_noise() {
        let mut input = dense_five();
        input.push(det(11.55, 21.55, 334.6, Some(55.0))); // ~1 degree away

        let outcome = build_zones(&input, &ClusterParams::default());
        assert_eq!(outcome.zones.len(), 1);
        assert_eq!(outcome.noise, 1);
        assert_eq!(outcome.skipped_small, 0);
        assert_eq!(outcome.skipped_degenerate, 0);

        let zone = &outcome.zones[0];
        assert_eq!(zone.count, 5);
        assert_eq!(zone.members.len(), 5);
        assert!(zone.boundary.len() >= 3);
        assert!((zone.avg_brightness - 366.58).abs() < 0.01);
        assert!((zone.max_brightness - 402.3).abs() < 1e-9);
        assert!((zone.avg_confidence - 79.8).abs() < 0.01);
        assert_eq!(zone.intensity, Intensity::Moderate);
    }

    #[test]
    fn test_pair_clusters_but_never_zones() {
        let input = vec![
            det(10.51, 20.51, 352.1, Some(78.0)),
            det(10.52, 20.52, 361.0, Some(81.0)),
        ];

        let labels = dbscan(&[(10.51, 20.51), (10.52, 20.52)], 0.05, 2);
        assert_eq!(labels[0], Some(0));
        assert_eq!(labels[1], Some(0));

        let outcome = build_zones(&input, &ClusterParams::default());
        assert!(outcome.zones.is_empty());
        assert_eq!(outcome.skipped_small, 1);
        assert_eq!(outcome.noise, 0);
    }

    #[test]
    fn test_single_point_is_noise() {
        let labels = dbscan(&[(10.51, 20.51)], 0.05, 2);
        assert_eq!(labels, vec![None]);
    }

    #[test]
    fn test_collinear_cluster_skipped() {
        let input = vec![
            det(10.50, 20.50, 352.1, Some(78.0)),
            det(10.51, 20.50, 361.0, Some(81.0)),
            det(10.52, 20.50, 345.7, Some(69.0)),
        ];

        let outcome = build_zones(&input, &ClusterParams::default());
        assert!(outcome.zones.is_empty());
        assert_eq!(outcome.skipped_degenerate, 1);
    }

    #[test]
    fn test_chained_points_share_cluster() {
        // Consecutive gaps under eps, endpoints well past it.
        let points = vec![
            (10.51, 20.51),
            (10.52, 20.53),
            (10.54, 20.52),
            (10.53, 20.55),
            (10.55, 20.54),
        ];
        let labels = dbscan(&points, 0.05, 2);
        assert!(labels.iter().all(|l| *l == Some(0)));
    }

    #[test]
    fn test_coarse_eps_merges_groups() {
        let mut points = vec![(10.51, 20.51), (10.52, 20.52)];
        points.push((10.85, 20.85)); // out of reach at 0.05, inside at 0.5

        let fine = dbscan(&points, 0.05, 2);
        assert_eq!(fine[2], None);

        let coarse = dbscan(&points, 0.5, 2);
        assert_eq!(coarse[2], Some(0));
    }

    #[test]
    fn test_buffer_expands_boundary() {
        let outcome = build_zones(&dense_five(), &ClusterParams::default());
        let zone = &outcome.zones[0];

        // Every buffered vertex sits further from the hull center than
        // the widest member offset would allow unbuffered.
        let (clat, clon) = zone.centroid;
        let max_member = dense_five()
            .iter()
            .map(|d| ((d.latitude - clat).powi(2) + (d.longitude - clon).powi(2)).sqrt())
            .fold(f64::NAN, f64::max);
        let max_boundary = zone
            .boundary
            .iter()
            .map(|(lat, lon)| ((lat - clat).powi(2) + (lon - clon).powi(2)).sqrt())
            .fold(f64::NAN, f64::max);
        assert!(max_boundary > max_member);
    }

    #[test]
    fn test_intensity_tiers() {
        assert_eq!(Intensity::from_aggregates(410.0, 50.0), Intensity::Extreme);
        assert_eq!(Intensity::from_aggregates(300.0, 95.0), Intensity::Extreme);
        assert_eq!(Intensity::from_aggregates(385.0, 50.0), Intensity::High);
        assert_eq!(Intensity::from_aggregates(300.0, 85.0), Intensity::High);
        assert_eq!(Intensity::from_aggregates(360.0, 50.0), Intensity::Moderate);
        assert_eq!(Intensity::from_aggregates(300.0, 75.0), Intensity::Moderate);
        assert_eq!(Intensity::from_aggregates(320.0, 50.0), Intensity::Low);
        assert_eq!(Intensity::from_aggregates(f64::NAN, f64::NAN), Intensity::Low);
    }

    #[test]
    fn test_unknown_confidence_excluded_from_average() {
        let input = vec![
            det(10.51, 20.51, 352.1, Some(80.0)),
            det(10.52, 20.53, 361.0, None),
            det(10.54, 20.52, 345.7, Some(60.0)),
        ];
        let outcome = build_zones(&input, &ClusterParams::default());
        assert_eq!(outcome.zones.len(), 1);
        assert!((outcome.zones[0].avg_confidence - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let outcome = build_zones(&[], &ClusterParams::default());
        assert!(outcome.zones.is_empty());
        assert_eq!(outcome.noise, 0);
    }
}
