//! Monotonic counter primitive.

use crate::core::{Result, TallyError};
use crate::metrics::labels::{label_key, LabelSet};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct CounterState {
    value: f64,
    labeled: HashMap<String, f64>,
}

/// A non-negative, monotonically non-decreasing accumulator.
///
/// Tracks one implicit unlabeled series plus one series per canonical label
/// key. All mutation is synchronous; the lock is never held across an await
/// point.
#[derive(Debug)]
pub struct Counter {
    name: String,
    state: RwLock<CounterState>,
}

impl Counter {
    /// Create a new counter for the given metric name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(CounterState::default()),
        }
    }

    /// The metric name this counter accumulates under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add `delta` to the unlabeled or labeled accumulator.
    ///
    /// A counter is not a gauge: negative deltas are rejected loudly so the
    /// call site learns immediately it mis-modeled the metric.
    pub fn inc(&self, delta: f64, labels: Option<&LabelSet>) -> Result<()> {
        if delta < 0.0 {
            return Err(TallyError::NegativeCounterDelta {
                name: self.name.clone(),
                delta,
            });
        }
        let mut state = self.state.write();
        match labels {
            Some(set) if !set.is_empty() => {
                *state.labeled.entry(label_key(set)).or_insert(0.0) += delta;
            },
            _ => state.value += delta,
        }
        Ok(())
    }

    /// Increment the unlabeled series by one.
    pub fn inc_by_one(&self) {
        // Delta 1.0 cannot fail validation.
        let _ = self.inc(1.0, None);
    }

    /// Current unlabeled value.
    pub fn value(&self) -> f64 {
        self.state.read().value
    }

    /// Snapshot of all labeled series, keyed by canonical label key.
    pub fn labeled_values(&self) -> HashMap<String, f64> {
        self.state.read().labeled.clone()
    }

    /// Value accumulated for one specific label set.
    pub fn value_for(&self, labels: &LabelSet) -> f64 {
        self.state
            .read()
            .labeled
            .get(&label_key(labels))
            .copied()
            .unwrap_or(0.0)
    }

    /// Zero the unlabeled value and discard the labeled map.
    ///
    /// Labeled series are not retained as zero entries; a future `inc` call
    /// recreates them.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.value = 0.0;
        state.labeled = HashMap::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::labels::labels;

    #[test]
    fn test_unlabeled_accumulation() {
        let counter = Counter::new("requests_total");
        counter.inc(1.0, None).unwrap();
        counter.inc(2.5, None).unwrap();
        assert_eq!(counter.value(), 3.5);
    }

    #[test]
    fn test_negative_delta_rejected() {
        let counter = Counter::new("requests_total");
        let err = counter.inc(-1.0, None).unwrap_err();
        assert_eq!(err.category(), "validation");
        assert_eq!(counter.value(), 0.0);
    }

    #[test]
    fn test_label_order_accumulates_single_series() {
        let counter = Counter::new("requests_total");
        counter
            .inc(1.0, Some(&labels(&[("b", "2"), ("a", "1")])))
            .unwrap();
        counter
            .inc(1.0, Some(&labels(&[("a", "1"), ("b", "2")])))
            .unwrap();

        let values = counter.labeled_values();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("a=1,b=2").copied(), Some(2.0));
        assert_eq!(counter.value_for(&labels(&[("a", "1"), ("b", "2")])), 2.0);
    }

    #[test]
    fn test_empty_label_set_hits_unlabeled_series() {
        let counter = Counter::new("requests_total");
        counter.inc(1.0, Some(&LabelSet::new())).unwrap();
        assert_eq!(counter.value(), 1.0);
        assert!(counter.labeled_values().is_empty());
    }

    #[test]
    fn test_reset_discards_labeled_map() {
        let counter = Counter::new("requests_total");
        counter.inc(5.0, None).unwrap();
        counter.inc(1.0, Some(&labels(&[("k", "v")]))).unwrap();

        counter.reset();
        assert_eq!(counter.value(), 0.0);
        assert!(counter.labeled_values().is_empty());
    }
}
