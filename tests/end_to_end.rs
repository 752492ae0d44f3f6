//! End-to-end scenarios across the registry, taxonomy and HTTP helpers.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tally::export::{validate_events, BufferSink, EventSink, MetricValue, MetricsEvent};
use tally::http::{
    normalize_route, record_http_request, track_active_request, HttpRequestRecord,
    NormalizeOptions,
};
use tally::metrics::{labels, MetricsRegistry};
use tally::taxonomy::Unit;
use tally::{Result, TallyError};

/// Route logs from the crate through a test-capture subscriber, honoring
/// `RUST_LOG` when set.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn order_request() -> HttpRequestRecord {
    HttpRequestRecord {
        method: "POST".to_string(),
        route: "/api/orders".to_string(),
        status: 201,
        duration_ms: 123.456,
        request_bytes: Some(1024.0),
        response_bytes: Some(512.0),
        service: Some("ecommerce".to_string()),
    }
}

fn find_labeled<'a>(events: &'a [MetricsEvent], name: &str) -> &'a MetricsEvent {
    events
        .iter()
        .find(|e| e.name == name && e.tags.is_some())
        .unwrap_or_else(|| panic!("no labeled {name} event"))
}

#[tokio::test]
async fn test_http_request_export_scenario() {
    init_tracing();
    let registry = MetricsRegistry::new();
    record_http_request(&registry, &order_request());

    let events = registry.export().await;
    assert!(validate_events(&events).is_empty());

    let counter = find_labeled(&events, "http_requests_total");
    assert_eq!(counter.value, MetricValue::Scalar(1.0));
    let tags = counter.tags.as_ref().unwrap();
    assert_eq!(tags.get("method").unwrap(), "POST");
    assert_eq!(tags.get("route").unwrap(), "/api/orders");
    assert_eq!(tags.get("status").unwrap(), "201");
    assert_eq!(tags.get("service").unwrap(), "ecommerce");
    assert_eq!(counter.unit, Some(Unit::Count));

    let duration = find_labeled(&events, "http_request_duration_seconds");
    match &duration.value {
        MetricValue::Summary(summary) => {
            assert_eq!(summary.count, 1);
            assert!((summary.sum - 0.123456).abs() < 1e-6);
        },
        other => panic!("expected summary, got {other:?}"),
    }
    assert_eq!(duration.unit, Some(Unit::Seconds));

    match &find_labeled(&events, "http_request_size_bytes").value {
        MetricValue::Summary(summary) => assert_eq!(summary.sum, 1024.0),
        other => panic!("expected summary, got {other:?}"),
    }
    match &find_labeled(&events, "http_response_size_bytes").value {
        MetricValue::Summary(summary) => assert_eq!(summary.sum, 512.0),
        other => panic!("expected summary, got {other:?}"),
    }
}

#[tokio::test]
async fn test_flush_resets_for_next_interval() {
    let registry = MetricsRegistry::new();
    record_http_request(&registry, &order_request());

    let sink = BufferSink::new();
    let flushed = registry.flush_to(&sink).await.unwrap();
    assert!(!flushed.is_empty());
    assert_eq!(sink.batches().len(), 1);

    // Every previously touched metric now exports only zero/empty state.
    let after = registry.export().await;
    for event in &after {
        assert!(event.tags.is_none(), "labeled series survived flush: {event:?}");
        match &event.value {
            MetricValue::Scalar(value) => assert_eq!(*value, 0.0),
            MetricValue::Summary(summary) => assert_eq!(summary.count, 0),
        }
    }
    // Names are retained even though values are gone.
    assert!(after.iter().any(|e| e.name == "http_requests_total"));
}

#[tokio::test]
async fn test_comma_in_route_survives_export() {
    init_tracing();
    let registry = MetricsRegistry::new();
    let mut record = order_request();
    // Commas are legal in URL paths and pass through route normalization.
    record.route = "/items/1,2".to_string();
    record_http_request(&registry, &record);

    let events = registry.export().await;
    let counter = find_labeled(&events, "http_requests_total");
    let tags = counter.tags.as_ref().unwrap();
    assert_eq!(tags.get("route").unwrap(), "/items/1,2");
    // No fabricated tag key from splitting the value.
    assert_eq!(tags.len(), 4);
}

#[tokio::test]
async fn test_flush_cleanup_survives_failing_sink() {
    init_tracing();
    struct FailingSink;

    #[async_trait::async_trait]
    impl EventSink for FailingSink {
        async fn emit(&self, _events: &[MetricsEvent]) -> Result<()> {
            Err(TallyError::sink("collector rejected batch"))
        }
    }

    let registry = MetricsRegistry::new();
    record_http_request(&registry, &order_request());

    let err = registry.flush_to(&FailingSink).await.unwrap_err();
    assert_eq!(err.category(), "sink");

    // State was still cleared: a second export sees nothing accumulated.
    let after = registry.export().await;
    assert!(after.iter().all(|e| e.tags.is_none()));
}

#[tokio::test]
async fn test_active_requests_across_interleaved_handlers() {
    let registry = Arc::new(MetricsRegistry::new());
    let tags = labels(&[("service", "ecommerce")]);

    let first = track_active_request(&registry, Some("ecommerce"));
    let second = track_active_request(&registry, Some("ecommerce"));
    assert_eq!(
        registry.gauge("http_active_requests").value_for(&tags),
        2.0
    );

    second.release();
    record_http_request(&registry, &order_request());
    first.release();

    let events = registry.export().await;
    let gauge = find_labeled(&events, "http_active_requests");
    assert_eq!(gauge.value, MetricValue::Scalar(0.0));
}

#[test]
fn test_route_normalization_scenarios() {
    let defaults = NormalizeOptions::default();
    assert_eq!(
        normalize_route("/users/123/orders/456", &defaults),
        "/users/:userId/orders/:orderId"
    );

    let generic = NormalizeOptions {
        context_aware: false,
        ..NormalizeOptions::default()
    };
    assert_eq!(normalize_route("/users/123", &generic), "/users/:id");
}

#[tokio::test]
async fn test_exported_batch_round_trips_as_json() {
    let registry = MetricsRegistry::new();
    record_http_request(&registry, &order_request());

    let events = registry.export().await;
    let json = serde_json::to_string(&events).unwrap();
    let parsed: Vec<MetricsEvent> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.len(), events.len());
    assert!(validate_events(&parsed).is_empty());
}
