//! Axum middleware adapter.
//!
//! Translates axum's request/response shapes into the framework-agnostic
//! helpers in [`crate::http`], wrapping the full request lifecycle so the
//! active-request gauge never leaks.

use crate::core::TelemetryConfig;
use crate::http::route::{normalize_route, NormalizeOptions};
use crate::http::{record_http_request, track_active_request, HttpRequestRecord};
use crate::metrics::MetricsRegistry;
use axum::extract::Request;
use axum::http::{header::CONTENT_LENGTH, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;

/// Per-router instrumentation state, cheap to clone into the middleware
/// closure.
#[derive(Clone)]
pub struct HttpInstrumentation {
    registry: Arc<MetricsRegistry>,
    service: Option<String>,
    options: Arc<NormalizeOptions>,
}

impl HttpInstrumentation {
    /// Instrument requests into the given registry.
    pub fn new(registry: Arc<MetricsRegistry>) -> Self {
        Self {
            registry,
            service: None,
            options: Arc::new(NormalizeOptions::default()),
        }
    }

    /// Build instrumentation from a [`TelemetryConfig`], taking the service
    /// name and route normalization settings from it.
    pub fn from_config(registry: Arc<MetricsRegistry>, config: &TelemetryConfig) -> Self {
        Self {
            registry,
            service: config.service_name.clone(),
            options: Arc::new(NormalizeOptions::from(&config.routes)),
        }
    }

    /// Set the `service` tag for every recorded request.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Replace the route normalization options.
    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    /// Middleware body for `axum::middleware::from_fn`.
    ///
    /// ```ignore
    /// let instrumentation = HttpInstrumentation::new(registry).with_service("shop");
    /// let app = Router::new()
    ///     .route("/users/:id", get(handler))
    ///     .layer(middleware::from_fn(move |req, next| {
    ///         let instrumentation = instrumentation.clone();
    ///         async move { instrumentation.track(req, next).await }
    ///     }));
    /// ```
    pub async fn track(&self, request: Request, next: Next) -> Response {
        let method = request.method().to_string();
        let route = normalize_route(request.uri().path(), &self.options);
        let request_bytes = content_length(request.headers());

        let active = track_active_request(&self.registry, self.service.as_deref());
        let start = Instant::now();
        let response = next.run(request).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        // Errors surface as responses in axum, so this covers the error
        // path too; the gauge is balanced before metrics are recorded.
        active.release();

        record_http_request(
            &self.registry,
            &HttpRequestRecord {
                method,
                route,
                status: response.status().as_u16(),
                duration_ms,
                request_bytes,
                response_bytes: content_length(response.headers()),
                service: self.service.clone(),
            },
        );

        response
    }
}

fn content_length(headers: &HeaderMap) -> Option<f64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::labels::labels;
    use axum::body::Body;
    use axum::routing::get;
    use axum::{middleware, Router};
    use tower::util::ServiceExt;

    fn instrumented_app(registry: Arc<MetricsRegistry>) -> Router {
        let instrumentation =
            HttpInstrumentation::new(registry).with_service("shop");
        Router::new()
            .route("/users/:id", get(|| async { "ok" }))
            .layer(middleware::from_fn(move |req, next| {
                let instrumentation = instrumentation.clone();
                async move { instrumentation.track(req, next).await }
            }))
    }

    #[tokio::test]
    async fn test_middleware_records_normalized_route() {
        let registry = Arc::new(MetricsRegistry::new());
        let app = instrumented_app(Arc::clone(&registry));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/users/123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let tags = labels(&[
            ("method", "GET"),
            ("route", "/users/:userId"),
            ("status", "200"),
            ("service", "shop"),
        ]);
        assert_eq!(
            registry.counter("http_requests_total").value_for(&tags),
            1.0
        );
    }

    #[tokio::test]
    async fn test_middleware_balances_active_gauge() {
        let registry = Arc::new(MetricsRegistry::new());
        let app = instrumented_app(Arc::clone(&registry));

        let _ = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/users/7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let tags = labels(&[("service", "shop")]);
        assert_eq!(
            registry.gauge("http_active_requests").value_for(&tags),
            0.0
        );
    }

    #[tokio::test]
    async fn test_middleware_records_error_responses() {
        let registry = Arc::new(MetricsRegistry::new());
        let app = instrumented_app(Arc::clone(&registry));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 404);

        let tags = labels(&[
            ("method", "GET"),
            ("route", "/missing"),
            ("status", "404"),
            ("service", "shop"),
        ]);
        assert_eq!(
            registry.counter("http_requests_total").value_for(&tags),
            1.0
        );
    }
}
