//! Telemetry pipeline configuration
//!
//! The core reads exactly two environment variables, once, at bootstrap:
//! `OTEL_SERVICE_NAME` and `OTEL_EXPORTER_OTLP_ENDPOINT`. Everything else is
//! set programmatically and falls back to the defaults below.

use std::collections::BTreeMap;
use std::time::Duration;

/// Environment variable holding the service name.
pub const ENV_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

/// Environment variable holding the collector endpoint.
pub const ENV_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Service name used when `OTEL_SERVICE_NAME` is unset.
pub const DEFAULT_SERVICE_NAME: &str = "go-service";

/// Collector endpoint used when `OTEL_EXPORTER_OTLP_ENDPOINT` is unset.
pub const DEFAULT_OTLP_ENDPOINT: &str = "localhost:4317";

/// Shared deadline for draining all three providers.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Top-level telemetry configuration consumed by [`bootstrap`](crate::telemetry::bootstrap).
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Attributes describing the emitting process
    pub resource: ResourceConfig,

    /// Collector connection, shared by all three exporters
    pub exporter: ExporterConfig,

    /// Batch span processor tuning
    pub traces: BatchConfig,

    /// Batch log processor tuning
    pub logs: BatchConfig,

    /// Periodic metric reader tuning
    pub metrics: MetricReaderConfig,

    /// Single budget shared by the shutdown of all three providers
    pub shutdown_timeout: Duration,

    /// Also register providers with `opentelemetry::global`. Default: true
    pub install_otel_globals: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            resource: ResourceConfig::default(),
            exporter: ExporterConfig::default(),
            traces: BatchConfig::default(),
            logs: BatchConfig::default(),
            metrics: MetricReaderConfig::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            install_otel_globals: true,
        }
    }
}

impl TelemetryConfig {
    /// Build a configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// A variable that is present is used verbatim, even when empty, so an
    /// explicitly empty endpoint is reported as an error at bootstrap rather
    /// than silently replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(name) = lookup(ENV_SERVICE_NAME) {
            config.resource.service_name = name;
        }
        if let Some(endpoint) = lookup(ENV_OTLP_ENDPOINT) {
            config.exporter.endpoint = endpoint;
        }
        config
    }

    /// Set the service name
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.resource.service_name = name.into();
        self
    }

    /// Set the collector endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.exporter.endpoint = endpoint.into();
        self
    }

    /// Set the shared shutdown deadline
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Enable or disable mirroring into `opentelemetry::global`
    pub fn with_otel_globals(mut self, install: bool) -> Self {
        self.install_otel_globals = install;
        self
    }
}

/// Resource descriptor attributes.
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// `service.name`. Default: "go-service"
    pub service_name: String,

    /// `service.version`, omitted when unset
    pub service_version: Option<String>,

    /// `deployment.environment.name`, omitted when unset
    pub deployment_environment: Option<String>,

    /// Additional free-form attributes
    pub attributes: BTreeMap<String, String>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_version: None,
            deployment_environment: None,
            attributes: BTreeMap::new(),
        }
    }
}

/// OTLP exporter connection settings.
///
/// One instance configures all three exporters, so every pipeline targets the
/// same collector with the same transport security.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Collector address. A bare `host:port` gets a scheme from `secure`.
    pub endpoint: String,

    /// Use TLS. Default: false (plaintext, like `WithInsecure`)
    pub secure: bool,

    /// Per-export request timeout. Default: 10 seconds
    pub timeout: Duration,

    /// gRPC metadata sent with every export request
    pub headers: BTreeMap<String, String>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            secure: false,
            timeout: Duration::from_secs(10),
            headers: BTreeMap::new(),
        }
    }
}

/// Batch processor configuration, used for both spans and log records.
///
/// The processor exports when either the scheduled delay elapses or a full
/// batch is queued. Items beyond `max_queue_size` are dropped.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of items buffered before dropping. Default: 2048
    pub max_queue_size: usize,

    /// Delay between scheduled exports. Default: 5 seconds
    pub scheduled_delay: Duration,

    /// Maximum number of items per export call. Default: 512
    pub max_export_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            scheduled_delay: Duration::from_secs(5),
            max_export_batch_size: 512,
        }
    }
}

/// Periodic metric reader configuration.
#[derive(Debug, Clone)]
pub struct MetricReaderConfig {
    /// Interval between collect-and-export cycles. Default: 60 seconds
    pub interval: Duration,
}

impl Default for MetricReaderConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}
