//! Point-in-time gauge primitive.

use crate::metrics::labels::{label_key, LabelSet};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct GaugeState {
    value: f64,
    labeled: HashMap<String, f64>,
}

/// An unconstrained signed value per series.
///
/// Unlike [`Counter`](crate::metrics::Counter) there is no monotonicity
/// invariant: `set`, `inc` and `dec` all permit negative results.
#[derive(Debug)]
pub struct Gauge {
    name: String,
    state: RwLock<GaugeState>,
}

impl Gauge {
    /// Create a new gauge for the given metric name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(GaugeState::default()),
        }
    }

    /// The metric name this gauge tracks.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the labeled or unlabeled series to `value`.
    pub fn set(&self, value: f64, labels: Option<&LabelSet>) {
        let mut state = self.state.write();
        match labels {
            Some(set) if !set.is_empty() => {
                state.labeled.insert(label_key(set), value);
            },
            _ => state.value = value,
        }
    }

    /// Add `delta` to the series (negative results permitted).
    pub fn inc(&self, delta: f64, labels: Option<&LabelSet>) {
        let mut state = self.state.write();
        match labels {
            Some(set) if !set.is_empty() => {
                *state.labeled.entry(label_key(set)).or_insert(0.0) += delta;
            },
            _ => state.value += delta,
        }
    }

    /// Subtract `delta` from the series.
    pub fn dec(&self, delta: f64, labels: Option<&LabelSet>) {
        self.inc(-delta, labels);
    }

    /// Current unlabeled value.
    pub fn value(&self) -> f64 {
        self.state.read().value
    }

    /// Snapshot of all labeled series, keyed by canonical label key.
    pub fn labeled_values(&self) -> HashMap<String, f64> {
        self.state.read().labeled.clone()
    }

    /// Value currently held for one specific label set.
    pub fn value_for(&self, labels: &LabelSet) -> f64 {
        self.state
            .read()
            .labeled
            .get(&label_key(labels))
            .copied()
            .unwrap_or(0.0)
    }

    /// Zero the unlabeled value and discard the labeled map.
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
    fn test_set_inc_dec() {
        let gauge = Gauge::new("active_requests");
        gauge.set(10.0, None);
        gauge.inc(1.0, None);
        gauge.dec(3.0, None);
        assert_eq!(gauge.value(), 8.0);
    }

    #[test]
    fn test_negative_values_permitted() {
        let gauge = Gauge::new("active_requests");
        gauge.dec(2.0, None);
        assert_eq!(gauge.value(), -2.0);

        let service = labels(&[("service", "api")]);
        gauge.dec(1.0, Some(&service));
        assert_eq!(gauge.value_for(&service), -1.0);
    }

    #[test]
    fn test_labeled_series_independent() {
        let gauge = Gauge::new("queue_depth");
        gauge.set(5.0, Some(&labels(&[("queue", "jobs")])));
        gauge.set(3.0, Some(&labels(&[("queue", "events")])));

        assert_eq!(gauge.value_for(&labels(&[("queue", "jobs")])), 5.0);
        assert_eq!(gauge.value_for(&labels(&[("queue", "events")])), 3.0);
        assert_eq!(gauge.value(), 0.0);
    }

    #[test]
    fn test_reset() {
        let gauge = Gauge::new("queue_depth");
        gauge.set(7.0, None);
        gauge.set(2.0, Some(&labels(&[("queue", "jobs")])));
        gauge.reset();
        assert_eq!(gauge.value(), 0.0);
        assert!(gauge.labeled_values().is_empty());
    }
}
