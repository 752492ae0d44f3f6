//! Metric primitives and the registry that owns them.
//!
//! Counters, gauges and histograms are self-contained accumulators keyed by
//! canonical label encodings. The [`MetricsRegistry`] hands out `Arc`
//! handles with get-or-create semantics and drives export and flush.

pub mod counter;
pub mod gauge;
pub mod histogram;
pub mod labels;
pub mod registry;

pub use counter::Counter;
pub use gauge::Gauge;
pub use histogram::{BucketCount, Histogram, HistogramSummary};
pub use labels::{label_key, labels, parse_label_key, LabelSet};
pub use registry::{default_registry, HistogramOptions, MetricsRegistry};
