//! OpenTelemetry Service Library
//!
//! Process-wide telemetry bootstrap for a network service, with a small HTTP
//! host that emits spans, metrics and logs through it.
//!
//! # Features
//!
//! - **Three pipelines**: traces, metrics and logs exported over OTLP/gRPC
//! - **Shared resource**: one descriptor attached to every signal
//! - **All-or-nothing bootstrap**: a failed exporter installs nothing
//! - **Injectable registry**: lock-free reads of the active providers
//! - **Bounded shutdown**: all providers drained within one shared deadline
//!
//! # Example
//!
//! ```no_run
//! use otel_service::config::{Config, TelemetryConfig};
//! use otel_service::server::Server;
//! use otel_service::telemetry::{bootstrap, TelemetryRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = TelemetryRegistry::global();
//!     let guard = bootstrap(&TelemetryConfig::from_env(), &registry)?;
//!
//!     let mut server = Server::new(Config::default().server, registry)?;
//!     server.run().await?;
//!
//!     guard.shutdown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod server;
pub mod telemetry;

// Re-export commonly used types
pub use config::{Config, TelemetryConfig};
pub use server::Server;
pub use telemetry::{bootstrap, TelemetryGuard, TelemetryRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
