//! HTTP instrumentation helpers.
//!
//! A thin composition layer that derives labeled observations from request
//! metadata and feeds them into a [`MetricsRegistry`]. Framework adapters
//! (see [`axum`]) translate their request/response shapes into
//! [`HttpRequestRecord`] and wrap the request lifecycle with
//! [`track_active_request`].

pub mod axum;
pub mod route;

pub use route::{
    estimate_route_cardinality, is_high_cardinality, normalize_route, NormalizeOptions,
};

use crate::metrics::labels::{labels, LabelSet};
use crate::metrics::{Gauge, MetricsRegistry};
use std::sync::Arc;

/// Service tag applied when the caller does not name one.
const UNKNOWN_SERVICE: &str = "unknown";

/// One completed HTTP request, framework-agnostic.
#[derive(Debug, Clone)]
pub struct HttpRequestRecord {
    /// Request method, e.g. `POST`.
    pub method: String,
    /// Normalized route template, e.g. `/api/orders`.
    pub route: String,
    /// Response status code.
    pub status: u16,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// Request body size, when known.
    pub request_bytes: Option<f64>,
    /// Response body size, when known.
    pub response_bytes: Option<f64>,
    /// Logical service name for the `service` tag.
    pub service: Option<String>,
}

/// Record one HTTP request into the standard metric set.
///
/// Performs up to four independent mutations: the `http_requests_total`
/// counter, the `http_request_duration_seconds` histogram (milliseconds
/// converted to seconds), and the request/response size histograms when the
/// byte counts are supplied. These are separate calls with no rollback;
/// a failure in one does not undo the others.
pub fn record_http_request(registry: &MetricsRegistry, record: &HttpRequestRecord) {
    let service = record.service.as_deref().unwrap_or(UNKNOWN_SERVICE);
    let status = record.status.to_string();

    let counter_tags = labels(&[
        ("method", &record.method),
        ("route", &record.route),
        ("status", &status),
        ("service", service),
    ]);
    // Delta 1.0 cannot fail counter validation.
    let _ = registry
        .counter("http_requests_total")
        .inc(1.0, Some(&counter_tags));

    let observation_tags = labels(&[
        ("method", &record.method),
        ("route", &record.route),
        ("service", service),
    ]);
    registry
        .histogram("http_request_duration_seconds", None)
        .observe(record.duration_ms / 1000.0, Some(&observation_tags));

    if let Some(bytes) = record.request_bytes {
        registry
            .histogram("http_request_size_bytes", None)
            .observe(bytes, Some(&observation_tags));
    }
    if let Some(bytes) = record.response_bytes {
        registry
            .histogram("http_response_size_bytes", None)
            .observe(bytes, Some(&observation_tags));
    }
}

/// Handle returned by [`track_active_request`].
///
/// `release` decrements the gauge and may be called more than once, which
/// drives the gauge negative. That is a known, accepted limitation of the
/// contract, preserved rather than silently clamped — adapters own calling
/// it exactly once per request.
#[derive(Debug)]
pub struct ActiveRequest {
    gauge: Arc<Gauge>,
    tags: LabelSet,
}

impl ActiveRequest {
    /// Decrement the active-request gauge.
    pub fn release(&self) {
        self.gauge.dec(1.0, Some(&self.tags));
    }
}

/// Increment the `http_active_requests` gauge for `service` and return a
/// handle whose [`release`](ActiveRequest::release) undoes it.
pub fn track_active_request(
    registry: &MetricsRegistry,
    service: Option<&str>,
) -> ActiveRequest {
    let tags = labels(&[("service", service.unwrap_or(UNKNOWN_SERVICE))]);
    let gauge = registry.gauge("http_active_requests");
    gauge.inc(1.0, Some(&tags));
    ActiveRequest { gauge, tags }
}
