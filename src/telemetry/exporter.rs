//! OTLP exporter construction
//!
//! All three exporters are built from one [`ExporterConfig`], so every signal
//! targets the same collector. Building an exporter never dials the collector:
//! tonic channels connect lazily, and connection errors only show up on the
//! first export or the shutdown flush. Building does need a Tokio runtime;
//! without one the factory returns [`TelemetryError::ExporterInit`].
//!
//! Endpoint resolution:
//!
//! | configured             | secure | resolved                  |
//! |------------------------|--------|---------------------------|
//! | `localhost:4317`       | false  | `http://localhost:4317`   |
//! | `collector:4317`       | true   | `https://collector:4317`  |
//! | `http://otel:4317`     | any    | `http://otel:4317`        |
//! | `""`                   | any    | error                     |

use crate::config::ExporterConfig;
use crate::telemetry::error::TelemetryError;
use crate::telemetry::signal::Signal;
use hyper::Uri;
use opentelemetry_otlp::{WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::logs::LogExporter;
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::trace::SpanExporter;
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tonic::transport::ClientTlsConfig;

/// Creates the exporter behind each signal pipeline.
///
/// [`OtlpExporterFactory`] is the production implementation. Tests plug in
/// in-memory exporters through the same seam.
pub trait ExporterFactory {
    type Span: SpanExporter + 'static;
    type Metric: PushMetricExporter;
    type Log: LogExporter + 'static;

    fn span_exporter(&self, config: &ExporterConfig) -> Result<Self::Span, TelemetryError>;

    fn metric_exporter(&self, config: &ExporterConfig) -> Result<Self::Metric, TelemetryError>;

    fn log_exporter(&self, config: &ExporterConfig) -> Result<Self::Log, TelemetryError>;
}

/// Builds OTLP/gRPC exporters backed by tonic.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtlpExporterFactory;

impl ExporterFactory for OtlpExporterFactory {
    type Span = opentelemetry_otlp::SpanExporter;
    type Metric = opentelemetry_otlp::MetricExporter;
    type Log = opentelemetry_otlp::LogExporter;

    fn span_exporter(&self, config: &ExporterConfig) -> Result<Self::Span, TelemetryError> {
        let builder = opentelemetry_otlp::SpanExporter::builder().with_tonic();
        let builder = configure(builder, config, Signal::Trace)?;
        require_runtime(Signal::Trace)?;
        builder
            .build()
            .map_err(|e| TelemetryError::exporter(Signal::Trace, e))
    }

    fn metric_exporter(&self, config: &ExporterConfig) -> Result<Self::Metric, TelemetryError> {
        let builder = opentelemetry_otlp::MetricExporter::builder().with_tonic();
        let builder = configure(builder, config, Signal::Metric)?;
        require_runtime(Signal::Metric)?;
        builder
            .build()
            .map_err(|e| TelemetryError::exporter(Signal::Metric, e))
    }

    fn log_exporter(&self, config: &ExporterConfig) -> Result<Self::Log, TelemetryError> {
        let builder = opentelemetry_otlp::LogExporter::builder().with_tonic();
        let builder = configure(builder, config, Signal::Log)?;
        require_runtime(Signal::Log)?;
        builder
            .build()
            .map_err(|e| TelemetryError::exporter(Signal::Log, e))
    }
}

/// Apply the shared connection settings to a tonic exporter builder.
fn configure<B>(builder: B, config: &ExporterConfig, signal: Signal) -> Result<B, TelemetryError>
where
    B: WithExportConfig + WithTonicConfig,
{
    let endpoint = resolve_endpoint(config).map_err(|reason| TelemetryError::exporter(signal, reason))?;
    let metadata = build_metadata(config).map_err(|reason| TelemetryError::exporter(signal, reason))?;

    let mut builder = builder
        .with_endpoint(endpoint.as_str())
        .with_timeout(config.timeout);

    if !metadata.is_empty() {
        builder = builder.with_metadata(metadata);
    }

    if endpoint.starts_with("https://") {
        builder = builder.with_tls_config(ClientTlsConfig::new().with_native_roots());
    }

    Ok(builder)
}

/// tonic sets up its lazy channel on the current Tokio reactor.
fn require_runtime(signal: Signal) -> Result<(), TelemetryError> {
    tokio::runtime::Handle::try_current()
        .map(|_| ())
        .map_err(|_| TelemetryError::exporter(signal, "no Tokio runtime"))
}

/// Resolve the configured endpoint into an absolute gRPC URI.
///
/// An explicit scheme wins over `secure`; a bare `host:port` gets `http://` or
/// `https://` depending on `secure`.
pub fn resolve_endpoint(config: &ExporterConfig) -> Result<String, String> {
    let raw = config.endpoint.trim();
    if raw.is_empty() {
        return Err("endpoint cannot be empty".to_string());
    }

    let endpoint = match raw.split_once("://") {
        Some(("http", _)) | Some(("https", _)) => raw.to_string(),
        Some((scheme, _)) => {
            return Err(format!(
                "unsupported scheme '{}' in endpoint '{}': must be http or https",
                scheme, raw
            ))
        }
        None if config.secure => format!("https://{}", raw),
        None => format!("http://{}", raw),
    };

    let uri: Uri = endpoint
        .parse()
        .map_err(|e| format!("malformed endpoint '{}': {}", raw, e))?;

    match uri.host() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(format!("endpoint '{}' has no host", raw)),
    }

    if !matches!(uri.path(), "" | "/") {
        return Err(format!(
            "endpoint '{}' must not contain a path for gRPC export",
            raw
        ));
    }

    Ok(endpoint)
}

fn build_metadata(config: &ExporterConfig) -> Result<MetadataMap, String> {
    let mut metadata = MetadataMap::new();
    for (name, value) in &config.headers {
        let key = name
            .parse::<MetadataKey<_>>()
            .map_err(|_| format!("invalid header name '{}'", name))?;
        let value = value
            .parse::<MetadataValue<_>>()
            .map_err(|_| format!("invalid value for header '{}'", name))?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}
