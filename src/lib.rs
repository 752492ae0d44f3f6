//! Tally - process-local telemetry primitives with OTLP-style export.
//!
//! Tally provides typed counters, gauges and histograms, a registry that
//! owns them, a taxonomy resolver for default units and buckets, and
//! export/flush logic producing a schema-shaped event batch for an
//! external sink to transmit.
//!
//! # Features
//!
//! - **Typed primitives**: counters reject negative deltas, gauges are
//!   unconstrained, histograms use cumulative OTLP-style buckets
//! - **Canonical labels**: label sets accumulate into one series regardless
//!   of key insertion order
//! - **Graceful taxonomy**: unknown metric names degrade to defaults,
//!   never crash a running service
//! - **Cleanup-guaranteed flush**: state is cleared even when the sink
//!   fails, so intervals never double-count
//! - **HTTP instrumentation**: framework-agnostic helpers, an axum
//!   middleware adapter, and a cardinality-aware route normalizer
//!
//! # Example
//!
//! ```no_run
//! use tally::http::{record_http_request, HttpRequestRecord};
//! use tally::metrics::MetricsRegistry;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = MetricsRegistry::new();
//!     record_http_request(
//!         &registry,
//!         &HttpRequestRecord {
//!             method: "POST".to_string(),
//!             route: "/api/orders".to_string(),
//!             status: 201,
//!             duration_ms: 123.456,
//!             request_bytes: Some(1024.0),
//!             response_bytes: Some(512.0),
//!             service: Some("ecommerce".to_string()),
//!         },
//!     );
//!     let events = registry.flush().await;
//!     println!("{}", serde_json::to_string_pretty(&events).unwrap());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod core;
pub mod export;
pub mod http;
pub mod metrics;
pub mod taxonomy;

// Re-export core types for convenience
pub use crate::core::{Result, TallyError, TelemetryConfig};
pub use crate::export::{EventSink, MetricsEvent};
pub use crate::metrics::{default_registry, MetricsRegistry};
