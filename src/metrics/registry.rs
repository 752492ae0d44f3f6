//! Metric registry: ownership, export and flush.

use crate::core::Result;
use crate::export::{EventSink, MetricValue, MetricsEvent};
use crate::metrics::counter::Counter;
use crate::metrics::gauge::Gauge;
use crate::metrics::histogram::{resolve_buckets, Histogram};
use crate::metrics::labels::parse_label_key;
use crate::taxonomy::TaxonomyResolver;
use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Creation-time options for histograms.
///
/// Only honored on first creation of a name; later calls with different
/// options get the existing instance unchanged (first-wins contract).
#[derive(Debug, Clone, Default)]
pub struct HistogramOptions {
    /// Explicit bucket boundaries, overriding all default resolution.
    pub buckets: Option<Vec<f64>>,
}

/// Owns every named metric instance in the process.
///
/// Instances are created lazily on first access and persist, zeroed but not
/// forgotten, across [`clear`](Self::clear) and [`flush`](Self::flush).
/// Handles are `Arc`s, so every call site with the same name accumulates
/// into one series.
pub struct MetricsRegistry {
    taxonomy: Arc<TaxonomyResolver>,
    counters: RwLock<HashMap<String, Arc<Counter>>>,
    gauges: RwLock<HashMap<String, Arc<Gauge>>>,
    histograms: RwLock<HashMap<String, Arc<Histogram>>>,
}

impl MetricsRegistry {
    /// Create a registry backed by the built-in taxonomy.
    pub fn new() -> Self {
        Self::with_taxonomy(TaxonomyResolver::new())
    }

    /// Create a registry with a specific taxonomy resolver.
    pub fn with_taxonomy(taxonomy: TaxonomyResolver) -> Self {
        Self {
            taxonomy: Arc::new(taxonomy),
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
        }
    }

    /// The taxonomy resolver this registry consults at export time.
    pub fn taxonomy(&self) -> &Arc<TaxonomyResolver> {
        &self.taxonomy
    }

    /// Get or create the counter registered under `name`.
    pub fn counter(&self, name: &str) -> Arc<Counter> {
        if let Some(counter) = self.counters.read().get(name) {
            return Arc::clone(counter);
        }
        let mut counters = self.counters.write();
        Arc::clone(
            counters
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Counter::new(name))),
        )
    }

    /// Get or create the gauge registered under `name`.
    pub fn gauge(&self, name: &str) -> Arc<Gauge> {
        if let Some(gauge) = self.gauges.read().get(name) {
            return Arc::clone(gauge);
        }
        let mut gauges = self.gauges.write();
        Arc::clone(
            gauges
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Gauge::new(name))),
        )
    }

    /// Get or create the histogram registered under `name`.
    ///
    /// Bucket resolution on first creation: explicit option buckets, then
    /// the `_ms` naming convention, then the taxonomy default, then the
    /// documented conservative fallback.
    pub fn histogram(&self, name: &str, options: Option<HistogramOptions>) -> Arc<Histogram> {
        if let Some(histogram) = self.histograms.read().get(name) {
            return Arc::clone(histogram);
        }
        let mut histograms = self.histograms.write();
        Arc::clone(histograms.entry(name.to_string()).or_insert_with(|| {
            let explicit = options.as_ref().and_then(|o| o.buckets.clone());
            let taxonomy_default = self.taxonomy.cached_buckets(name);
            let buckets = resolve_buckets(name, explicit.as_deref(), taxonomy_default.as_deref());
            Arc::new(Histogram::with_buckets(name, &buckets))
        }))
    }

    /// Names of every registered metric, sorted.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .counters
            .read()
            .keys()
            .chain(self.gauges.read().keys())
            .chain(self.histograms.read().keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Number of registered metric instances.
    pub fn metric_count(&self) -> usize {
        self.counters.read().len() + self.gauges.read().len() + self.histograms.read().len()
    }

    /// Reset every registered metric to its zero state.
    ///
    /// Registered names are retained; only accumulated values are dropped.
    pub fn clear(&self) {
        for counter in self.counters.read().values() {
            counter.reset();
        }
        for gauge in self.gauges.read().values() {
            gauge.reset();
        }
        for histogram in self.histograms.read().values() {
            histogram.reset();
        }
    }

    /// Serialize every registered metric into a batch of events.
    ///
    /// The unlabeled series of each metric is emitted unconditionally, even
    /// at zero, so dashboards always have a baseline. Labeled counter and
    /// histogram series are emitted only when non-trivial (value or count
    /// above zero); labeled gauge series are always emitted because a
    /// gauge's current value of zero is meaningful.
    ///
    /// Async only because the first taxonomy lookup may read the catalog
    /// file; a mutation landing between two lookups inside one export is a
    /// tolerated inconsistency, not a bug — export is best-effort analytics.
    pub async fn export(&self) -> Vec<MetricsEvent> {
        let timestamp = Utc::now();
        let mut events = Vec::new();

        // Snapshot handles first so no lock is held across an await point.
        let counters = snapshot(&self.counters);
        let gauges = snapshot(&self.gauges);
        let histograms = snapshot(&self.histograms);

        for (name, counter) in counters {
            let unit = self.taxonomy.default_unit(&name).await;
            events.push(MetricsEvent {
                timestamp,
                name: name.clone(),
                value: MetricValue::Scalar(counter.value()),
                tags: None,
                unit: Some(unit),
            });
            let mut labeled: Vec<_> = counter.labeled_values().into_iter().collect();
            labeled.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in labeled {
                if value > 0.0 {
                    events.push(MetricsEvent {
                        timestamp,
                        name: name.clone(),
                        value: MetricValue::Scalar(value),
                        tags: Some(parse_label_key(&key)),
                        unit: Some(unit),
                    });
                }
            }
        }

        for (name, gauge) in gauges {
            let unit = self.taxonomy.default_unit(&name).await;
            events.push(MetricsEvent {
                timestamp,
                name: name.clone(),
                value: MetricValue::Scalar(gauge.value()),
                tags: None,
                unit: Some(unit),
            });
            let mut labeled: Vec<_> = gauge.labeled_values().into_iter().collect();
            labeled.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in labeled {
                events.push(MetricsEvent {
                    timestamp,
                    name: name.clone(),
                    value: MetricValue::Scalar(value),
                    tags: Some(parse_label_key(&key)),
                    unit: Some(unit),
                });
            }
        }

        for (name, histogram) in histograms {
            let unit = self.taxonomy.default_unit(&name).await;
            events.push(MetricsEvent {
                timestamp,
                name: name.clone(),
                value: MetricValue::Summary(histogram.summary()),
                tags: None,
                unit: Some(unit),
            });
            let mut labeled: Vec<_> = histogram.labeled_summaries().into_iter().collect();
            labeled.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, summary) in labeled {
                if summary.count > 0 {
                    events.push(MetricsEvent {
                        timestamp,
                        name: name.clone(),
                        value: MetricValue::Summary(summary),
                        tags: Some(parse_label_key(&key)),
                        unit: Some(unit),
                    });
                }
            }
        }

        events
    }

    /// Export the current state, then reset it for the next interval.
    pub async fn flush(&self) -> Vec<MetricsEvent> {
        let events = self.export().await;
        self.clear();
        events
    }

    /// Export, hand the batch to `sink`, then reset state.
    ///
    /// `clear` runs on every exit path, so a misbehaving sink cannot cause
    /// double-counting on the next interval. A sink error propagates only
    /// after cleanup has run.
    pub async fn flush_to(&self, sink: &dyn EventSink) -> Result<Vec<MetricsEvent>> {
        let events = self.export().await;
        let emit_result = sink.emit(&events).await;
        self.clear();
        emit_result?;
        Ok(events)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot<T>(map: &RwLock<HashMap<String, Arc<T>>>) -> Vec<(String, Arc<T>)> {
    let mut entries: Vec<(String, Arc<T>)> = map
        .read()
        .iter()
        .map(|(name, value)| (name.clone(), Arc::clone(value)))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

static DEFAULT_REGISTRY: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::new);

/// The process-wide default registry.
///
/// A convenience for call sites that do not thread a registry through;
/// created on first use and never torn down. Libraries and tests should
/// prefer constructing their own [`MetricsRegistry`] — nothing here is
/// hidden shared state beyond this one instance.
pub fn default_registry() -> &'static MetricsRegistry {
    &DEFAULT_REGISTRY
}
