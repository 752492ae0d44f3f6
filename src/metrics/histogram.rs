//! Cumulative histogram primitive.
//!
//! Buckets are OTLP-style cumulative: each configured boundary counts every
//! observation at or below it, so counts are non-decreasing across ascending
//! boundaries. There is no `+Inf` overflow bucket; observations above the
//! largest boundary still contribute to `count` and `sum` but to no bucket.
//! That keeps the exported shape aligned with the downstream schema and is
//! deliberate, not an accounting bug.

use crate::metrics::labels::{label_key, LabelSet};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Canonical duration buckets, in milliseconds, applied to any metric whose
/// name ends in `_ms`.
pub const DURATION_MS_BUCKETS: &[f64] = &[
    1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0,
];

/// Conservative fallback buckets (seconds-scale) used when neither the
/// caller nor the taxonomy supplies boundaries. Callers that want anything
/// meaningful for non-duration metrics should pass explicit buckets.
pub const DEFAULT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Resolve the bucket boundaries for a histogram.
///
/// Precedence: explicit caller buckets, then the `_ms` naming convention,
/// then the taxonomy default, then [`DEFAULT_BUCKETS`]. The `_ms` convention
/// lives here, in one place, so it stays testable and overridable.
pub fn resolve_buckets(
    name: &str,
    explicit: Option<&[f64]>,
    taxonomy_default: Option<&[f64]>,
) -> Vec<f64> {
    if let Some(buckets) = explicit {
        return buckets.to_vec();
    }
    if name.ends_with("_ms") {
        return DURATION_MS_BUCKETS.to_vec();
    }
    if let Some(buckets) = taxonomy_default {
        return buckets.to_vec();
    }
    DEFAULT_BUCKETS.to_vec()
}

/// One cumulative bucket: count of observations `<= le`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketCount {
    /// Upper boundary (inclusive).
    pub le: f64,
    /// Cumulative observation count at or below the boundary.
    pub count: u64,
}

/// Exported snapshot of one histogram series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    /// Total number of observations, including bucket overflows.
    pub count: u64,
    /// Sum of all observed values.
    pub sum: f64,
    /// Cumulative buckets in construction order.
    pub buckets: Vec<BucketCount>,
}

#[derive(Debug, Clone)]
struct Series {
    count: u64,
    sum: f64,
    bucket_counts: SmallVec<[u64; 12]>,
}

impl Series {
    fn new(len: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            bucket_counts: SmallVec::from_elem(0, len),
        }
    }

    fn observe(&mut self, value: f64, bounds: &[f64]) {
        self.count += 1;
        self.sum += value;
        // O(buckets) scan; bucket counts are small (typically <= 10).
        for (i, &bound) in bounds.iter().enumerate() {
            if bound >= value {
                self.bucket_counts[i] += 1;
            }
        }
    }

    fn summary(&self, bounds: &[f64]) -> HistogramSummary {
        HistogramSummary {
            count: self.count,
            sum: self.sum,
            buckets: bounds
                .iter()
                .zip(self.bucket_counts.iter())
                .map(|(&le, &count)| BucketCount { le, count })
                .collect(),
        }
    }
}

#[derive(Debug)]
struct HistogramState {
    unlabeled: Series,
    labeled: HashMap<String, Series>,
}

/// A distribution accumulator with fixed ascending boundaries.
#[derive(Debug)]
pub struct Histogram {
    name: String,
    bounds: SmallVec<[f64; 12]>,
    state: RwLock<HistogramState>,
}

impl Histogram {
    /// Create a histogram with explicit bucket boundaries.
    ///
    /// Boundaries must be ascending; they are established once here and
    /// never change for the lifetime of the instance.
    pub fn with_buckets(name: impl Into<String>, buckets: &[f64]) -> Self {
        let bounds: SmallVec<[f64; 12]> = buckets.iter().copied().collect();
        let len = bounds.len();
        Self {
            name: name.into(),
            bounds,
            state: RwLock::new(HistogramState {
                unlabeled: Series::new(len),
                labeled: HashMap::new(),
            }),
        }
    }

    /// The metric name this histogram observes under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured bucket boundaries.
    pub fn buckets(&self) -> &[f64] {
        &self.bounds
    }

    /// Record one observation into the labeled or unlabeled series.
    pub fn observe(&self, value: f64, labels: Option<&LabelSet>) {
        let mut state = self.state.write();
        match labels {
            Some(set) if !set.is_empty() => {
                let key = label_key(set);
                let len = self.bounds.len();
                state
                    .labeled
                    .entry(key)
                    .or_insert_with(|| Series::new(len))
                    .observe(value, &self.bounds);
            },
            _ => state.unlabeled.observe(value, &self.bounds),
        }
    }

    /// Snapshot of the unlabeled series.
    pub fn summary(&self) -> HistogramSummary {
        self.state.read().unlabeled.summary(&self.bounds)
    }

    /// Snapshots of all labeled series, keyed by canonical label key.
    pub fn labeled_summaries(&self) -> HashMap<String, HistogramSummary> {
        let state = self.state.read();
        state
            .labeled
            .iter()
            .map(|(key, series)| (key.clone(), series.summary(&self.bounds)))
            .collect()
    }

    /// Snapshot of the series for one specific label set.
    pub fn summary_for(&self, labels: &LabelSet) -> Option<HistogramSummary> {
        let state = self.state.read();
        state
            .labeled
            .get(&label_key(labels))
            .map(|series| series.summary(&self.bounds))
    }

    /// Zero the unlabeled series and discard the labeled map.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.unlabeled = Series::new(self.bounds.len());
        state.labeled = HashMap::new();
    }
}
