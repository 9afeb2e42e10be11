//! Pipeline Tests
//!
//! Tests that telemetry emitted through the registry reaches the exporters
//! with the shared resource attached, and that the guard drains the
//! providers on explicit shutdown and on drop.

mod common;

use common::{test_config, InMemoryExporters};
use otel_service::server::handlers::emit_log;
use otel_service::telemetry::{bootstrap_with, ProviderState, Signal, TelemetryRegistry};
use opentelemetry::logs::{AnyValue, Severity};
use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::trace::{Span as _, Tracer as _, TracerProvider as _};
use opentelemetry::{Key, KeyValue, Value};
use std::time::Duration;

fn service_name(resource: &opentelemetry_sdk::Resource) -> Option<Value> {
    resource.get(&Key::from_static_str("service.name"))
}

/// Test: one span, one metric point and one log record are all exported
#[test]
fn test_all_signals_reach_exporters() {
    let registry = TelemetryRegistry::new();
    let exporters = InMemoryExporters::default();
    let guard = bootstrap_with(&test_config(), &registry, &exporters).expect("bootstrap");

    let tracer = registry.tracer_provider().expect("tracer").tracer("pipeline-test");
    let mut span = tracer.start("checkout");
    span.set_attribute(KeyValue::new("order.items", 3));
    span.end();

    let meter = registry.meter_provider().expect("meter").meter("pipeline-test");
    let counter = meter.u64_counter("orders.placed").build();
    counter.add(1, &[KeyValue::new("region", "eu")]);

    assert!(emit_log(
        &registry,
        Severity::Info,
        "Hello endpoint called from Go service"
    ));

    guard.flush();

    let spans = exporters.spans.get_finished_spans().expect("spans");
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "checkout");

    let metrics = exporters.metrics.get_finished_metrics().expect("metrics");
    assert!(!metrics.is_empty());

    let logs = exporters.logs.get_emitted_logs().expect("logs");
    assert_eq!(logs.len(), 1);
    let record = &logs[0].record;
    assert_eq!(
        record.body(),
        Some(&AnyValue::String(
            "Hello endpoint called from Go service".into()
        ))
    );
    assert_eq!(record.severity_number(), Some(Severity::Info));

    let report = guard.shutdown();
    assert!(report.is_clean());
    assert!(report.elapsed < Duration::from_secs(5));
}

/// Test: every signal carries the same resource descriptor
#[test]
fn test_resource_shared_across_signals() {
    let registry = TelemetryRegistry::new();
    let exporters = InMemoryExporters::default();
    let guard = bootstrap_with(&test_config(), &registry, &exporters).expect("bootstrap");

    registry
        .tracer_provider()
        .expect("tracer")
        .tracer("pipeline-test")
        .start("op")
        .end();
    registry
        .meter_provider()
        .expect("meter")
        .meter("pipeline-test")
        .u64_counter("ops")
        .build()
        .add(1, &[]);
    emit_log(&registry, Severity::Debug, "op done");

    guard.flush();

    let expected = Some(Value::from("go-service"));

    let logs = exporters.logs.get_emitted_logs().expect("logs");
    assert_eq!(service_name(&logs[0].resource), expected);

    let metrics = exporters.metrics.get_finished_metrics().expect("metrics");
    assert_eq!(service_name(metrics[0].resource()), expected);

    // Spans do not carry the resource; it lives on the provider.
    let spans = exporters.spans.get_finished_spans().expect("spans");
    assert_eq!(spans.len(), 1);

    assert!(guard.shutdown().is_clean());
}

/// Test: the guard reports every provider as active before shutdown
#[test]
fn test_guard_states_before_shutdown() {
    let registry = TelemetryRegistry::new();
    let guard = bootstrap_with(&test_config(), &registry, &InMemoryExporters::default())
        .expect("bootstrap");

    assert!(guard.is_active());
    for signal in Signal::ALL {
        assert_eq!(guard.state(signal), ProviderState::Active);
    }

    let report = guard.shutdown();
    for signal in Signal::ALL {
        assert_eq!(report.get(signal).unwrap().state, ProviderState::Closed);
    }
}

/// Test: dropping the guard shuts the providers down
#[test]
fn test_drop_shuts_down_providers() {
    let registry = TelemetryRegistry::new();
    let guard = bootstrap_with(&test_config(), &registry, &InMemoryExporters::default())
        .expect("bootstrap");

    drop(guard);

    // A second shutdown of an already closed provider is rejected.
    let tracer = registry.tracer_provider().expect("tracer stays registered");
    assert!(tracer.shutdown().is_err());
    let logger = registry.logger_provider().expect("logger stays registered");
    assert!(logger.shutdown().is_err());
}

/// Test: dropping a guard after explicit shutdown does not drain again
#[test]
fn test_explicit_shutdown_then_drop() {
    let registry = TelemetryRegistry::new();
    let guard = bootstrap_with(&test_config(), &registry, &InMemoryExporters::default())
        .expect("bootstrap");

    // `shutdown` consumes the guard; its drop runs right after and must not
    // turn the clean report into an error.
    let report = guard.shutdown();

    assert!(report.is_clean());
    assert_eq!(report.failures().count(), 0);
}

/// Test: emitting after shutdown does not panic
#[test]
fn test_emit_after_shutdown() {
    let registry = TelemetryRegistry::new();
    let guard = bootstrap_with(&test_config(), &registry, &InMemoryExporters::default())
        .expect("bootstrap");
    guard.shutdown();

    assert!(emit_log(&registry, Severity::Error, "late record"));
}
