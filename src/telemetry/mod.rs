//! OpenTelemetry bootstrap and lifecycle module
//!
//! Configures three independent signal pipelines that all export over
//! OTLP/gRPC to the same collector:
//!
//! - **Traces**: batch span processor
//! - **Metrics**: periodic reader (pull instruments, then push)
//! - **Logs**: batch log record processor
//!
//! The providers share one resource descriptor, are installed together into a
//! [`TelemetryRegistry`], and are drained together by the [`TelemetryGuard`]
//! within a single shutdown deadline.
//!
//! # Example
//!
//! ```no_run
//! use otel_service::config::TelemetryConfig;
//! use otel_service::telemetry::{bootstrap, TelemetryRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = TelemetryRegistry::global();
//!     let guard = bootstrap(&TelemetryConfig::from_env(), &registry)?;
//!
//!     // Handlers read providers from the registry
//!     assert!(registry.tracer_provider().is_some());
//!
//!     // Providers are flushed and closed here, or when `guard` is dropped
//!     guard.shutdown();
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod error;
pub mod exporter;
pub mod guard;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod shutdown;
pub mod signal;
pub mod subscriber;

pub use bootstrap::{bootstrap, bootstrap_with};
pub use error::TelemetryError;
pub use exporter::{ExporterFactory, OtlpExporterFactory};
pub use guard::TelemetryGuard;
pub use registry::{Providers, TelemetryRegistry};
pub use shutdown::{ProviderState, ShutdownOrchestrator, ShutdownReport};
pub use signal::Signal;
pub use subscriber::init_subscriber;
