//! OpenTelemetry Service - HTTP service with OTLP traces, metrics and logs
//!
//! Telemetry is bootstrapped before the server starts. A bootstrap failure
//! aborts the process with a non-zero exit code.

use anyhow::Context;
use clap::Parser;
use otel_service::config::{Config, TelemetryConfig};
use otel_service::server::Server;
use otel_service::telemetry::{self, TelemetryRegistry};
use std::path::PathBuf;
use tracing::{info, warn};

/// OpenTelemetry Service - emits traces, metrics and logs over OTLP/gRPC
#[derive(Parser, Debug)]
#[command(name = "otel-service")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => Config::default(),
    };
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    let registry = TelemetryRegistry::global();
    let telemetry_config = TelemetryConfig::from_env();

    // Dropping the guard on any exit path below drains the providers.
    let guard = telemetry::bootstrap(&telemetry_config, &registry)
        .context("Failed to initialize telemetry")?;
    telemetry::init_subscriber(&guard, &config.logging)?;

    info!("Starting otel-service v{}", otel_service::VERSION);

    let mut server = Server::new(config.server, registry)?;
    let result = server.run().await;

    let report = guard.shutdown();
    if !report.is_clean() {
        warn!(
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Exiting with unflushed telemetry"
        );
    }

    result.map_err(Into::into)
}
