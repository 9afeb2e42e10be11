//! Provider registry
//!
//! Holds the current tracer, meter and logger provider. Request handlers read
//! from it on every request while writes only happen at bootstrap, so each
//! slot is an [`ArcSwapOption`]: a read is one atomic pointer load and never
//! contends with other readers or with a concurrent re-installation.
//!
//! Services should receive an `Arc<TelemetryRegistry>` at construction time.
//! [`TelemetryRegistry::global`] exists for the binary's entry point.

use arc_swap::ArcSwapOption;
use lazy_static::lazy_static;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::sync::Arc;

lazy_static! {
    static ref GLOBAL_REGISTRY: Arc<TelemetryRegistry> = Arc::new(TelemetryRegistry::new());
}

/// One provider per signal, installed together by bootstrap.
#[derive(Clone, Debug)]
pub struct Providers {
    pub tracer: SdkTracerProvider,
    pub meter: SdkMeterProvider,
    pub logger: SdkLoggerProvider,
}

/// Providers displaced by a re-installation.
#[derive(Debug, Default)]
pub struct Replaced {
    pub tracer: Option<Arc<SdkTracerProvider>>,
    pub meter: Option<Arc<SdkMeterProvider>>,
    pub logger: Option<Arc<SdkLoggerProvider>>,
}

impl Replaced {
    /// True when no slot held a provider before the install.
    pub fn is_empty(&self) -> bool {
        self.tracer.is_none() && self.meter.is_none() && self.logger.is_none()
    }
}

/// Thread-safe container for the active provider of each signal.
#[derive(Debug, Default)]
pub struct TelemetryRegistry {
    tracer: ArcSwapOption<SdkTracerProvider>,
    meter: ArcSwapOption<SdkMeterProvider>,
    logger: ArcSwapOption<SdkLoggerProvider>,
}

impl TelemetryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by the service binary
    pub fn global() -> Arc<TelemetryRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Install all three providers, replacing whatever each slot held.
    pub fn install(&self, providers: Providers) -> Replaced {
        Replaced {
            tracer: self.tracer.swap(Some(Arc::new(providers.tracer))),
            meter: self.meter.swap(Some(Arc::new(providers.meter))),
            logger: self.logger.swap(Some(Arc::new(providers.logger))),
        }
    }

    /// Current trace provider
    pub fn tracer_provider(&self) -> Option<Arc<SdkTracerProvider>> {
        self.tracer.load_full()
    }

    /// Current meter provider
    pub fn meter_provider(&self) -> Option<Arc<SdkMeterProvider>> {
        self.meter.load_full()
    }

    /// Current logger provider
    pub fn logger_provider(&self) -> Option<Arc<SdkLoggerProvider>> {
        self.logger.load_full()
    }

    /// True when no slot holds a provider
    pub fn is_empty(&self) -> bool {
        self.tracer.load().is_none() && self.meter.load().is_none() && self.logger.load().is_none()
    }

    /// True when every slot holds a provider
    pub fn is_complete(&self) -> bool {
        self.tracer.load().is_some() && self.meter.load().is_some() && self.logger.load().is_some()
    }
}
