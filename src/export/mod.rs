//! Export types for the telemetry subsystem.
//!
//! [`MetricsEvent`] is the only boundary artifact this crate produces.
//! Shipping the batch anywhere (HTTP push, file append, stdout) is the
//! sink's responsibility, behind the [`EventSink`] seam.

pub mod sink;

pub use sink::{BufferSink, EventSink, Flusher};

use crate::metrics::histogram::HistogramSummary;
use crate::metrics::labels::LabelSet;
use crate::taxonomy::Unit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The value carried by one exported event: a scalar for counters and
/// gauges, or a histogram summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Counter or gauge reading.
    Scalar(f64),
    /// Histogram `{count, sum, buckets}` summary.
    Summary(HistogramSummary),
}

/// One schema-shaped, OTLP-style exported snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsEvent {
    /// Collection timestamp, RFC3339 on the wire.
    pub timestamp: DateTime<Utc>,
    /// Taxonomy-enumerated metric name.
    pub name: String,
    /// Scalar or histogram summary.
    pub value: MetricValue,
    /// Label dimensions, absent for the unlabeled series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<LabelSet>,
    /// Measurement unit resolved from the taxonomy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl MetricsEvent {
    /// Build an event stamped with the current time.
    pub fn now(name: impl Into<String>, value: MetricValue) -> Self {
        Self {
            timestamp: Utc::now(),
            name: name.into(),
            value,
            tags: None,
            unit: None,
        }
    }
}

/// One schema-shape finding for an exported batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Index of the offending event within the batch.
    pub event_index: usize,
    /// Human-readable description of the problem.
    pub message: String,
}

/// Check a batch of events against the wire-shape rules.
///
/// Returns a diagnostics list instead of failing: malformed events degrade
/// telemetry quality, they do not cascade into application failure.
pub fn validate_events(events: &[MetricsEvent]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (index, event) in events.iter().enumerate() {
        let mut report = |message: String| {
            diagnostics.push(Diagnostic {
                event_index: index,
                message,
            });
        };

        if event.name.is_empty() {
            report("event name is empty".to_string());
        }

        match &event.value {
            MetricValue::Scalar(value) => {
                if !value.is_finite() {
                    report(format!("scalar value {value} is not finite"));
                }
            },
            MetricValue::Summary(summary) => {
                if !summary.sum.is_finite() {
                    report(format!("histogram sum {} is not finite", summary.sum));
                }
                for window in summary.buckets.windows(2) {
                    if window[0].le >= window[1].le {
                        report(format!(
                            "bucket boundaries not ascending: {} then {}",
                            window[0].le, window[1].le
                        ));
                    }
                    if window[0].count > window[1].count {
                        report(format!(
                            "cumulative bucket counts decrease at le={}",
                            window[1].le
                        ));
                    }
                }
                if let Some(last) = summary.buckets.last() {
                    if last.count > summary.count {
                        report("bucket count exceeds total observation count".to_string());
                    }
                }
            },
        }

        if let Some(tags) = &event.tags {
            for key in tags.keys() {
                if key.is_empty() {
                    report("tag with empty key".to_string());
                }
            }
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::histogram::BucketCount;
    use crate::metrics::labels::labels;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scalar_event_wire_shape() {
        let mut event = MetricsEvent::now("http_requests_total", MetricValue::Scalar(3.0));
        event.tags = Some(labels(&[("method", "GET")]));
        event.unit = Some(Unit::Count);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], "http_requests_total");
        assert_eq!(json["value"], 3.0);
        assert_eq!(json["tags"]["method"], "GET");
        assert_eq!(json["unit"], "count");
        // RFC3339 timestamp.
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_summary_event_wire_shape() {
        let summary = HistogramSummary {
            count: 2,
            sum: 0.3,
            buckets: vec![
                BucketCount { le: 0.1, count: 1 },
                BucketCount { le: 0.5, count: 2 },
            ],
        };
        let event = MetricsEvent::now(
            "http_request_duration_seconds",
            MetricValue::Summary(summary),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["value"]["count"], 2);
        assert_eq!(json["value"]["buckets"][1]["le"], 0.5);
        assert!(json.get("tags").is_none());
    }

    #[test]
    fn test_validate_clean_batch() {
        let events = vec![MetricsEvent::now("x", MetricValue::Scalar(1.0))];
        assert!(validate_events(&events).is_empty());
    }

    #[test]
    fn test_validate_reports_instead_of_failing() {
        let events = vec![
            MetricsEvent::now("", MetricValue::Scalar(f64::NAN)),
            MetricsEvent::now(
                "h",
                MetricValue::Summary(HistogramSummary {
                    count: 1,
                    sum: 0.0,
                    buckets: vec![
                        BucketCount { le: 0.5, count: 2 },
                        BucketCount { le: 0.1, count: 1 },
                    ],
                }),
            ),
        ];

        let diagnostics = validate_events(&events);
        assert!(diagnostics.len() >= 3);
        assert_eq!(diagnostics[0].event_index, 0);
        assert!(diagnostics.iter().any(|d| d.message.contains("ascending")));
    }
}
