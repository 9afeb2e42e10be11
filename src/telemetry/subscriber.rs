//! Tracing subscriber setup with layered architecture
//!
//! Bridges the `tracing` ecosystem onto the installed providers:
//!
//! ```text
//! Registry
//!   ├── EnvFilter (RUST_LOG, falls back to the configured level)
//!   ├── Fmt layer (console output, plain or JSON)
//!   ├── OpenTelemetry layer (spans → tracer provider)
//!   └── Log bridge (events → logger provider)
//! ```
//!
//! The log bridge ignores events from the exporter stack itself. Otherwise a
//! failed export would log an event, which would be exported, which would fail.

use crate::config::LoggingConfig;
use crate::telemetry::error::TelemetryError;
use crate::telemetry::guard::TelemetryGuard;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Instrumentation scope name for spans created through `tracing`
const TRACER_NAME: &str = "otel-service";

/// Targets whose events never reach the log bridge
const BRIDGE_EXCLUDED_TARGETS: &[&str] = &[
    "opentelemetry",
    "opentelemetry_sdk",
    "opentelemetry_otlp",
    "tonic",
    "h2",
    "hyper",
    "hyper_util",
    "tower",
];

/// Install the global `tracing` subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::Subscriber`] when a global subscriber is already
/// set.
pub fn init_subscriber(
    guard: &TelemetryGuard,
    logging: &LoggingConfig,
) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_lowercase()));

    let json_layer = logging.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
    });
    let text_layer = (!logging.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
    });

    let tracer = guard.tracer_provider().tracer(TRACER_NAME);
    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let log_bridge = OpenTelemetryTracingBridge::new(guard.logger_provider())
        .with_filter(bridge_filter());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(telemetry_layer)
        .with(log_bridge)
        .try_init()
        .map_err(|e| {
            TelemetryError::Subscriber(format!(
                "Failed to set global subscriber (may already be initialized): {}",
                e
            ))
        })
}

fn bridge_filter() -> Targets {
    BRIDGE_EXCLUDED_TARGETS.iter().fold(
        Targets::new().with_default(LevelFilter::TRACE),
        |targets, target| targets.with_target(*target, LevelFilter::OFF),
    )
}
