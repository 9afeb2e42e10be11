//! Shared helpers for integration tests

#![allow(dead_code)]

use otel_service::config::{ExporterConfig, TelemetryConfig};
use otel_service::telemetry::{ExporterFactory, Signal, TelemetryError};
use opentelemetry_sdk::logs::InMemoryLogExporter;
use opentelemetry_sdk::metrics::InMemoryMetricExporter;
use opentelemetry_sdk::trace::InMemorySpanExporter;
use std::time::Duration;

/// Exporter factory handing out clones of in-memory exporters, so tests can
/// inspect what the providers exported.
#[derive(Clone, Default)]
pub struct InMemoryExporters {
    pub spans: InMemorySpanExporter,
    pub metrics: InMemoryMetricExporter,
    pub logs: InMemoryLogExporter,
}

impl ExporterFactory for InMemoryExporters {
    type Span = InMemorySpanExporter;
    type Metric = InMemoryMetricExporter;
    type Log = InMemoryLogExporter;

    fn span_exporter(&self, _config: &ExporterConfig) -> Result<Self::Span, TelemetryError> {
        Ok(self.spans.clone())
    }

    fn metric_exporter(&self, _config: &ExporterConfig) -> Result<Self::Metric, TelemetryError> {
        Ok(self.metrics.clone())
    }

    fn log_exporter(&self, _config: &ExporterConfig) -> Result<Self::Log, TelemetryError> {
        Ok(self.logs.clone())
    }
}

/// Factory whose exporter for one signal cannot be constructed.
#[derive(Clone, Default)]
pub struct FailingExporters {
    pub failing: Option<Signal>,
    pub inner: InMemoryExporters,
}

impl FailingExporters {
    pub fn failing(signal: Signal) -> Self {
        Self {
            failing: Some(signal),
            inner: InMemoryExporters::default(),
        }
    }

    fn check(&self, signal: Signal) -> Result<(), TelemetryError> {
        if self.failing == Some(signal) {
            return Err(TelemetryError::ExporterInit {
                signal,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

impl ExporterFactory for FailingExporters {
    type Span = InMemorySpanExporter;
    type Metric = InMemoryMetricExporter;
    type Log = InMemoryLogExporter;

    fn span_exporter(&self, config: &ExporterConfig) -> Result<Self::Span, TelemetryError> {
        self.check(Signal::Trace)?;
        self.inner.span_exporter(config)
    }

    fn metric_exporter(&self, config: &ExporterConfig) -> Result<Self::Metric, TelemetryError> {
        self.check(Signal::Metric)?;
        self.inner.metric_exporter(config)
    }

    fn log_exporter(&self, config: &ExporterConfig) -> Result<Self::Log, TelemetryError> {
        self.check(Signal::Log)?;
        self.inner.log_exporter(config)
    }
}

/// Configuration that leaves `opentelemetry::global` alone
pub fn test_config() -> TelemetryConfig {
    TelemetryConfig::default()
        .with_service_name("go-service")
        .with_endpoint("localhost:4317")
        .with_shutdown_timeout(Duration::from_secs(5))
        .with_otel_globals(false)
}
