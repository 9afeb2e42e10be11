//! Telemetry lifecycle guard
//!
//! The [`TelemetryGuard`] is the shutdown handle returned by bootstrap. It
//! keeps the three providers it installed and drains them exactly once,
//! either through [`TelemetryGuard::shutdown`] or, on any other exit path
//! (early return, `?`, panic unwinding), when it is dropped.

use crate::telemetry::registry::Providers;
use crate::telemetry::shutdown::{
    ManagedProvider, ProviderState, ShutdownOrchestrator, ShutdownReport,
};
use crate::telemetry::signal::Signal;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::sync::Arc;
use std::time::Duration;

/// RAII guard for the telemetry providers
///
/// `shutdown` consumes the guard, so a second explicit shutdown does not
/// compile. Dropping a guard that was already shut down does nothing.
///
/// # Example
///
/// ```no_run
/// use otel_service::config::TelemetryConfig;
/// use otel_service::telemetry::{bootstrap, TelemetryRegistry};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = TelemetryRegistry::new();
///     let guard = bootstrap(&TelemetryConfig::from_env(), &registry)?;
///
///     // ... serve requests ...
///
///     let report = guard.shutdown();
///     assert!(report.timeout.as_secs() <= 5);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct TelemetryGuard {
    providers: Providers,
    managed: Vec<ManagedProvider>,
    orchestrator: ShutdownOrchestrator,
    active: bool,
}

impl TelemetryGuard {
    pub(crate) fn new(providers: Providers, shutdown_timeout: Duration) -> Self {
        let managed = vec![
            ManagedProvider::new(Signal::Trace, Arc::new(providers.tracer.clone())),
            ManagedProvider::new(Signal::Metric, Arc::new(providers.meter.clone())),
            ManagedProvider::new(Signal::Log, Arc::new(providers.logger.clone())),
        ];

        Self {
            providers,
            managed,
            orchestrator: ShutdownOrchestrator::new(shutdown_timeout),
            active: true,
        }
    }

    /// Check if the providers have not been shut down yet
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.providers.tracer
    }

    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.providers.meter
    }

    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.providers.logger
    }

    /// The shared deadline applied at shutdown
    pub fn shutdown_timeout(&self) -> Duration {
        self.orchestrator.timeout()
    }

    /// Lifecycle state of one signal's provider
    pub fn state(&self, signal: Signal) -> ProviderState {
        self.managed
            .iter()
            .find(|m| m.signal() == signal)
            .map(ManagedProvider::state)
            .unwrap_or(ProviderState::Active)
    }

    /// Flush all providers without shutting them down.
    ///
    /// Flush errors are logged via `tracing::warn!` with target `otel_lifecycle`.
    pub fn flush(&self) {
        if let Err(e) = self.providers.tracer.force_flush() {
            tracing::warn!(target: "otel_lifecycle", error = %e, "Failed to flush tracer provider");
        }
        if let Err(e) = self.providers.meter.force_flush() {
            tracing::warn!(target: "otel_lifecycle", error = %e, "Failed to flush meter provider");
        }
        if let Err(e) = self.providers.logger.force_flush() {
            tracing::warn!(target: "otel_lifecycle", error = %e, "Failed to flush logger provider");
        }
    }

    /// Drain and close all three providers within the shared deadline.
    pub fn shutdown(mut self) -> ShutdownReport {
        self.shutdown_inner()
    }

    fn shutdown_inner(&mut self) -> ShutdownReport {
        // Mark as inactive to prevent double shutdown in Drop
        self.active = false;
        self.orchestrator.run(&self.managed)
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        // Failures are already logged by the orchestrator.
        if self.active {
            self.shutdown_inner();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn providers() -> Providers {
        Providers {
            tracer: SdkTracerProvider::builder().build(),
            meter: SdkMeterProvider::builder().build(),
            logger: SdkLoggerProvider::builder().build(),
        }
    }

    #[test]
    fn test_new_guard_is_active() {
        let guard = TelemetryGuard::new(providers(), Duration::from_secs(1));
        assert!(guard.is_active());
        assert_eq!(guard.shutdown_timeout(), Duration::from_secs(1));
        assert_eq!(guard.state(Signal::Log), ProviderState::Active);
        assert!(guard.shutdown().is_clean());
    }

    #[test]
    fn test_unclean_drop_reports_through_tracing() {
        let providers = providers();
        let _ = providers.tracer.shutdown();
        let _ = providers.logger.shutdown();
        let guard = TelemetryGuard::new(providers, Duration::from_secs(1));

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || drop(guard));

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Telemetry provider did not shut down cleanly"));
        assert!(output.contains("trace"));
        assert!(output.contains("log"));
    }
}
