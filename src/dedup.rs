//! Detection deduplication.
//!
//! Overlapping satellite passes report the same fire pixel more than
//! once. Detections collapse onto a key of coordinates rounded to 3
//! decimals (roughly 110 m on the ground) plus the acquisition date;
//! the first occurrence wins. The precision is a heuristic: fine enough
//! to separate neighboring pixels, coarse enough to merge jitter
//! between passes.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::models::Detection;

/// Deduplication key: milli-degree coordinates plus acquisition date.
pub type DedupKey = (i64, i64, NaiveDate);

/// Compute the deduplication key for a detection.
#[must_use]
pub fn dedup_key(detection: &Detection) -> DedupKey {
    (
        round_milli(detection.latitude),
        round_milli(detection.longitude),
        detection.acq_date,
    )
}

#[allow(clippy::cast_possible_truncation)] // coordinates are validated in range
fn round_milli(degrees: f64) -> i64 {
    (degrees * 1000.0).round() as i64
}

/// Tracks seen detection keys within one run.
#[derive(Debug, Default)]
pub struct DedupeSet {
    seen: HashSet<DedupKey>,
    total_seen: u64,
    total_dupes: u64,
}

impl DedupeSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a detection against the set, marking its key as seen.
    pub fn check_and_mark(&mut self, detection: &Detection) -> DedupeResult {
        self.total_seen += 1;
        if self.seen.insert(dedup_key(detection)) {
            DedupeResult::New
        } else {
            self.total_dupes += 1;
            DedupeResult::Duplicate
        }
    }

    /// Number of distinct keys tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if no keys are tracked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Total detections processed.
    #[must_use]
    pub fn total_seen(&self) -> u64 {
        self.total_seen
    }

    /// Total duplicates skipped.
    #[must_use]
    pub fn total_dupes(&self) -> u64 {
        self.total_dupes
    }

    /// Duplicate rate (0.0 to 1.0).
    #[must_use]
    pub fn dupe_rate(&self) -> f64 {
        if self.total_seen == 0 {
            0.0
        } else {
            self.total_dupes as f64 / self.total_seen as f64
        }
    }
}

/// Result of a deduplication check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupeResult {
    /// Key not seen before in this run
    New,
    /// Same rounded position and date already recorded; first wins
    Duplicate,
}

impl DedupeResult {
    /// Check if this detection should be kept.
    #[must_use]
    pub fn should_emit(self) -> bool {
        matches!(self, Self::New)
    }
}

/// Deduplicate a batch, preserving input order.
///
/// Returns the survivors and the number of duplicates removed.
#[must_use]
pub fn dedup_detections(detections: Vec<Detection>) -> (Vec<Detection>, usize) {
    let mut set = DedupeSet::new();
    let mut kept = Vec::with_capacity(detections.len());
    for detection in detections {
        if set.check_and_mark(&detection).should_emit() {
            kept.push(detection);
        }
    }
    let removed = usize::try_from(set.total_dupes()).unwrap_or(usize::MAX);
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(lat: f64, lon: f64, date: &str, satellite: &str) -> Detection {
        Detection {
            latitude: lat,
            longitude: lon,
            acq_date: date.parse().unwrap(),
            acq_time: "1200".into(),
            brightness: 320.0,
            confidence: Some(65.0),
            confidence_raw: "65".into(),
            satellite: satellite.into(),
            source: "MODIS (Terra+Aqua)".into(),
            frp: None,
            scan: None,
            track: None,
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let input = vec![
            det(13.1231, 15.2341, "2026-08-20", "Terra"),
            det(13.1233, 15.2342, "2026-08-20", "Aqua"),
        ];
        let (kept, removed) = dedup_detections(input);
        assert_eq!(kept.len(), 1);
        assert_eq!(removed, 1);
        assert_eq!(kept[0].satellite, "Terra");
    }

    #[test]
    fn test_rounding_boundary() {
        // 13.1234 -> 13123, 13.1236 -> 13124: distinct keys.
        let input = vec![
            det(13.1234, 15.2341, "2026-08-20", "Terra"),
            det(13.1236, 15.2341, "2026-08-20", "Aqua"),
        ];
        let (kept, removed) = dedup_detections(input);
        assert_eq!(kept.len(), 2);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_same_position_different_date_kept() {
        let input = vec![
            det(13.1231, 15.2341, "2026-08-20", "Terra"),
            det(13.1231, 15.2341, "2026-08-21", "Terra"),
        ];
        let (kept, removed) = dedup_detections(input);
        assert_eq!(kept.len(), 2);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_idempotent() {
        let input = vec![
            det(13.1231, 15.2341, "2026-08-20", "Terra"),
            det(13.1233, 15.2342, "2026-08-20", "Aqua"),
            det(10.51, 20.51, "2026-08-21", "Terra"),
        ];
        let (once, removed_once) = dedup_detections(input);
        assert_eq!(removed_once, 1);

        let (twice, removed_twice) = dedup_detections(once.clone());
        assert_eq!(removed_twice, 0);
        assert_eq!(twice.len(), once.len());
    }

    #[test]
    fn test_dupe_rate() {
        let mut set = DedupeSet::new();
        let a = det(13.1231, 15.2341, "2026-08-20", "Terra");
        set.check_and_mark(&a);
        set.check_and_mark(&a);
        set.check_and_mark(&a);
        set.check_and_mark(&det(10.51, 20.51, "2026-08-21", "Terra"));

        // 2 dupes out of 4 = 50%
        assert!((set.dupe_rate() - 0.5).abs() < 0.01);
        assert_eq!(set.len(), 2);
        assert_eq!(set.total_seen(), 4);
        assert_eq!(set.total_dupes(), 2);
    }
}
