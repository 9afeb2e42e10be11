//! Request handlers
//!
//! Handlers reach telemetry only through the registry in [`AppState`]. When a
//! slot is empty (telemetry not bootstrapped) the corresponding signal is
//! simply skipped.

use crate::server::instruments::RequestMetrics;
use crate::telemetry::TelemetryRegistry;
use arc_swap::ArcSwapOption;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Response, StatusCode};
use opentelemetry::logs::{AnyValue, LogRecord as _, Logger as _, LoggerProvider as _, Severity};
use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::trace::{Span as _, Tracer as _, TracerProvider as _};
use opentelemetry::{KeyValue, StringValue};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use serde_json::json;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Instrumentation scope for telemetry emitted by the handlers
pub const SCOPE: &str = "otel-service";

/// Body of the log record emitted by `/api/hello`
pub const HELLO_LOG_BODY: &str = "Hello endpoint called from Rust service";

/// Request instruments bound to one meter provider
struct BoundMetrics {
    provider: Arc<SdkMeterProvider>,
    metrics: RequestMetrics,
}

/// Shared handler state
pub struct AppState {
    registry: Arc<TelemetryRegistry>,
    metrics: ArcSwapOption<BoundMetrics>,
}

impl AppState {
    pub fn new(registry: Arc<TelemetryRegistry>) -> Self {
        Self {
            registry,
            metrics: ArcSwapOption::empty(),
        }
    }

    pub fn registry(&self) -> &TelemetryRegistry {
        &self.registry
    }

    /// Instruments for the meter provider currently in the registry.
    ///
    /// Rebuilt whenever a bootstrap replaces the provider.
    fn request_metrics(&self) -> Option<Arc<BoundMetrics>> {
        let provider = self.registry.meter_provider()?;
        if let Some(bound) = self.metrics.load_full() {
            if Arc::ptr_eq(&bound.provider, &provider) {
                return Some(bound);
            }
        }

        let metrics = RequestMetrics::new(&provider.meter(SCOPE));
        let bound = Arc::new(BoundMetrics { provider, metrics });
        self.metrics.store(Some(Arc::clone(&bound)));
        Some(bound)
    }
}

/// Dispatch a request and record its metrics
pub fn route(method: &Method, path: &str, state: &AppState) -> Response<Full<Bytes>> {
    let started = Instant::now();
    let (route, response) = match (method, path) {
        (&Method::GET, "/") => ("/", root_handler()),
        (&Method::GET, "/api/hello") => ("/api/hello", hello_handler(state)),
        (&Method::GET, "/health") => ("/health", health_handler()),
        _ => ("unmatched", not_found_handler()),
    };

    if let Some(bound) = state.request_metrics() {
        bound.metrics.record(
            method.as_str(),
            route,
            response.status().as_u16(),
            started.elapsed(),
        );
    }
    response
}

/// Emit one log record through the registry's logger provider.
///
/// Returns false when no logger provider is installed.
pub fn emit_log(
    registry: &TelemetryRegistry,
    severity: Severity,
    body: impl Into<StringValue>,
) -> bool {
    let Some(provider) = registry.logger_provider() else {
        return false;
    };

    let logger = provider.logger(SCOPE);
    let mut record = logger.create_log_record();
    let now = SystemTime::now();
    record.set_timestamp(now);
    record.set_observed_timestamp(now);
    record.set_severity_number(severity);
    record.set_severity_text(severity.name());
    record.set_body(AnyValue::String(body.into()));
    logger.emit(record);
    true
}

/// Handle / endpoint
fn root_handler() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        json!({ "message": "Rust OpenTelemetry Service" }),
    )
}

/// Handle /api/hello endpoint
fn hello_handler(state: &AppState) -> Response<Full<Bytes>> {
    let span = state.registry.tracer_provider().map(|provider| {
        let mut span = provider.tracer(SCOPE).start("handle_hello");
        span.set_attribute(KeyValue::new("http.request.method", "GET"));
        span.set_attribute(KeyValue::new("http.route", "/api/hello"));
        span
    });

    emit_log(&state.registry, Severity::Info, HELLO_LOG_BODY);

    let response = json_response(
        StatusCode::OK,
        json!({
            "message": "Hello from Rust with OpenTelemetry!",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    );

    if let Some(mut span) = span {
        span.set_attribute(KeyValue::new(
            "http.response.status_code",
            i64::from(response.status().as_u16()),
        ));
        span.end();
    }
    response
}

/// Handle /health endpoint
fn health_handler() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, json!({ "status": "ok" }))
}

/// Handle unknown endpoints
fn not_found_handler() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"Not Found")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_routes_without_telemetry() {
        let state = AppState::new(Arc::new(TelemetryRegistry::new()));

        let root = route(&Method::GET, "/", &state);
        assert_eq!(root.status(), StatusCode::OK);
        assert_eq!(body_json(root).await["message"], "Rust OpenTelemetry Service");

        let hello = route(&Method::GET, "/api/hello", &state);
        assert_eq!(hello.status(), StatusCode::OK);
        let body = body_json(hello).await;
        assert_eq!(body["message"], "Hello from Rust with OpenTelemetry!");
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn test_unknown_route_is_not_found() {
        let state = AppState::new(Arc::new(TelemetryRegistry::new()));
        assert_eq!(
            route(&Method::POST, "/api/hello", &state).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            route(&Method::GET, "/missing", &state).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_emit_log_without_provider() {
        let registry = TelemetryRegistry::new();
        assert!(!emit_log(&registry, Severity::Info, "dropped"));
    }
}
