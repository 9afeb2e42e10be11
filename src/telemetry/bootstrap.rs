//! Telemetry bootstrap
//!
//! Construction is all-or-nothing. The resource and all three exporters are
//! built before any provider exists, and providers are installed into the
//! registry only once every step has succeeded. A failed bootstrap leaves the
//! registry exactly as it found it.

use crate::config::TelemetryConfig;
use crate::telemetry::error::TelemetryError;
use crate::telemetry::exporter::{ExporterFactory, OtlpExporterFactory};
use crate::telemetry::guard::TelemetryGuard;
use crate::telemetry::provider::{
    build_logger_provider, build_meter_provider, build_tracer_provider,
};
use crate::telemetry::registry::{Providers, TelemetryRegistry};
use crate::telemetry::resource::build_resource;
use opentelemetry::global;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use tracing::{debug, info};

/// Bootstrap the telemetry subsystem with OTLP/gRPC exporters.
///
/// Must be called from within a Tokio runtime: the tonic exporters attach to
/// the current reactor, and keep exporting through it until shutdown.
///
/// # Errors
///
/// Returns [`TelemetryError::ResourceBuild`] or [`TelemetryError::ExporterInit`]
/// when construction fails, including when no Tokio runtime is running.
/// Nothing is installed in that case.
pub fn bootstrap(
    config: &TelemetryConfig,
    registry: &TelemetryRegistry,
) -> Result<TelemetryGuard, TelemetryError> {
    bootstrap_with(config, registry, &OtlpExporterFactory)
}

/// Bootstrap the telemetry subsystem with exporters from `factory`.
pub fn bootstrap_with<F>(
    config: &TelemetryConfig,
    registry: &TelemetryRegistry,
    factory: &F,
) -> Result<TelemetryGuard, TelemetryError>
where
    F: ExporterFactory,
{
    let resource = build_resource(&config.resource)?;

    let span_exporter = factory.span_exporter(&config.exporter)?;
    let metric_exporter = factory.metric_exporter(&config.exporter)?;
    let log_exporter = factory.log_exporter(&config.exporter)?;

    let providers = Providers {
        tracer: build_tracer_provider(span_exporter, resource.clone(), &config.traces),
        meter: build_meter_provider(metric_exporter, resource.clone(), &config.metrics),
        logger: build_logger_provider(log_exporter, resource, &config.logs),
    };

    let replaced = registry.install(providers.clone());
    if !replaced.is_empty() {
        debug!(
            target: "otel_lifecycle",
            "Replaced previously installed telemetry providers"
        );
    }

    if config.install_otel_globals {
        install_otel_globals(&providers);
    }

    info!(
        target: "otel_lifecycle",
        service_name = %config.resource.service_name,
        endpoint = %config.exporter.endpoint,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard::new(providers, config.shutdown_timeout))
}

/// Mirror providers into `opentelemetry::global` for instrumentation
/// libraries that only know about the OpenTelemetry globals.
fn install_otel_globals(providers: &Providers) {
    global::set_tracer_provider(providers.tracer.clone());
    global::set_meter_provider(providers.meter.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));
}
