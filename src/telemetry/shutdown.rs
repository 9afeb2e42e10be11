//! Bounded shutdown of the signal providers
//!
//! The orchestrator drains every registered provider against one shared
//! deadline. Each provider shuts down on its own worker thread, so a provider
//! that hangs costs the others nothing: all of them are attempted, and the
//! caller is released once the deadline passes even if some never finish.
//!
//! ```text
//! Active ──▶ Draining ──▶ Closed
//!                    ├──▶ Failed
//!                    └──▶ TimedOut
//! ```
//!
//! The three right-hand states are terminal. A worker that completes after its
//! provider was marked `TimedOut` leaves the state untouched.

use crate::telemetry::signal::Signal;
use opentelemetry_sdk::error::{OTelSdkError, OTelSdkResult};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A provider that can flush its buffers and release its exporter.
pub trait Drainable: Send + Sync + 'static {
    /// Export everything still buffered, then close the exporter.
    fn drain(&self) -> OTelSdkResult;
}

impl Drainable for SdkTracerProvider {
    fn drain(&self) -> OTelSdkResult {
        self.shutdown()
    }
}

impl Drainable for SdkMeterProvider {
    fn drain(&self) -> OTelSdkResult {
        self.shutdown()
    }
}

impl Drainable for SdkLoggerProvider {
    fn drain(&self) -> OTelSdkResult {
        self.shutdown()
    }
}

/// Lifecycle state of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Active,
    Draining,
    Closed,
    Failed,
    TimedOut,
}

impl ProviderState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Draining,
            2 => Self::Closed,
            3 => Self::Failed,
            _ => Self::TimedOut,
        }
    }

    /// True for `Closed`, `Failed` and `TimedOut`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Draining => "draining",
            Self::Closed => "closed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        };
        f.write_str(s)
    }
}

/// Atomic holder for a [`ProviderState`] that only moves forward.
#[derive(Debug)]
pub struct Lifecycle(AtomicU8);

impl Default for Lifecycle {
    fn default() -> Self {
        Self(AtomicU8::new(ProviderState::Active as u8))
    }
}

impl Lifecycle {
    pub fn state(&self) -> ProviderState {
        ProviderState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// `Active → Draining`. Returns false if draining already began.
    fn begin_drain(&self) -> bool {
        self.transition(ProviderState::Active, ProviderState::Draining)
    }

    /// `Draining → Closed | Failed`. Returns false if the provider already
    /// timed out.
    fn finish(&self, ok: bool) -> bool {
        let next = if ok {
            ProviderState::Closed
        } else {
            ProviderState::Failed
        };
        self.transition(ProviderState::Draining, next)
    }

    /// `Draining → TimedOut`. Returns false if the worker finished first.
    fn time_out(&self) -> bool {
        self.transition(ProviderState::Draining, ProviderState::TimedOut)
    }

    fn transition(&self, from: ProviderState, to: ProviderState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// A provider registered for shutdown, together with its lifecycle.
#[derive(Clone)]
pub struct ManagedProvider {
    signal: Signal,
    provider: Arc<dyn Drainable>,
    lifecycle: Arc<Lifecycle>,
}

impl ManagedProvider {
    pub fn new(signal: Signal, provider: Arc<dyn Drainable>) -> Self {
        Self {
            signal,
            provider,
            lifecycle: Arc::new(Lifecycle::default()),
        }
    }

    pub fn signal(&self) -> Signal {
        self.signal
    }

    pub fn state(&self) -> ProviderState {
        self.lifecycle.state()
    }
}

impl fmt::Debug for ManagedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedProvider")
            .field("signal", &self.signal)
            .field("state", &self.state())
            .finish()
    }
}

/// Outcome of shutting down one provider.
#[derive(Debug, Clone)]
pub struct SignalShutdown {
    pub signal: Signal,
    pub state: ProviderState,
    pub error: Option<String>,
    /// Time from the start of shutdown until the worker reported back
    pub elapsed: Option<Duration>,
}

/// Aggregate outcome of a shutdown run.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    pub signals: Vec<SignalShutdown>,
    pub elapsed: Duration,
    pub timeout: Duration,
}

impl ShutdownReport {
    /// True when every provider reached `Closed`.
    pub fn is_clean(&self) -> bool {
        self.signals.iter().all(|s| s.state == ProviderState::Closed)
    }

    pub fn get(&self, signal: Signal) -> Option<&SignalShutdown> {
        self.signals.iter().find(|s| s.signal == signal)
    }

    /// Signals that did not close cleanly.
    pub fn failures(&self) -> impl Iterator<Item = &SignalShutdown> {
        self.signals
            .iter()
            .filter(|s| s.state != ProviderState::Closed)
    }
}

/// Drains a set of providers against one shared deadline.
#[derive(Debug, Clone, Copy)]
pub struct ShutdownOrchestrator {
    timeout: Duration,
}

type WorkerResult = (usize, Result<(), String>, Duration);

impl ShutdownOrchestrator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Shut down every provider, returning once all report back or the
    /// deadline passes, whichever comes first.
    pub fn run(&self, providers: &[ManagedProvider]) -> ShutdownReport {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let (tx, rx) = mpsc::channel::<WorkerResult>();

        let mut outcomes: Vec<SignalShutdown> = providers
            .iter()
            .map(|p| SignalShutdown {
                signal: p.signal,
                state: p.state(),
                error: None,
                elapsed: None,
            })
            .collect();

        let mut pending = 0usize;
        for (index, managed) in providers.iter().enumerate() {
            if !managed.lifecycle.begin_drain() {
                debug!(
                    target: "otel_lifecycle",
                    signal = %managed.signal,
                    state = %managed.state(),
                    "Provider already draining, skipping"
                );
                continue;
            }

            match spawn_drain(index, managed.clone(), started, tx.clone()) {
                Ok(()) => pending += 1,
                Err(e) => {
                    managed.lifecycle.finish(false);
                    outcomes[index].error = Some(format!("failed to spawn shutdown worker: {}", e));
                }
            }
        }
        drop(tx);

        while pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok((index, result, elapsed)) => {
                    pending -= 1;
                    outcomes[index].error = result.err();
                    outcomes[index].elapsed = Some(elapsed);
                }
                Err(_) => break,
            }
        }

        for (outcome, managed) in outcomes.iter_mut().zip(providers) {
            if managed.lifecycle.time_out() {
                outcome.error = Some(format!(
                    "did not finish within the {:?} shutdown budget",
                    self.timeout
                ));
            }
            outcome.state = managed.state();
        }

        let report = ShutdownReport {
            signals: outcomes,
            elapsed: started.elapsed(),
            timeout: self.timeout,
        };
        log_report(&report);
        report
    }
}

fn spawn_drain(
    index: usize,
    managed: ManagedProvider,
    started: Instant,
    tx: mpsc::Sender<WorkerResult>,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name(format!("otel-shutdown-{}", managed.signal))
        .spawn(move || {
            let result = managed.provider.drain().map_err(describe);
            if !managed.lifecycle.finish(result.is_ok()) {
                debug!(
                    target: "otel_lifecycle",
                    signal = %managed.signal,
                    "Provider finished after the shutdown deadline"
                );
            }
            // The orchestrator may have stopped listening; nothing to do then.
            let _ = tx.send((index, result, started.elapsed()));
        })
        .map(|_| ())
}

fn describe(error: OTelSdkError) -> String {
    match error {
        OTelSdkError::AlreadyShutdown => "provider was already shut down".to_string(),
        other => other.to_string(),
    }
}

fn log_report(report: &ShutdownReport) {
    if report.is_clean() {
        info!(
            target: "otel_lifecycle",
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Telemetry providers shut down"
        );
        return;
    }

    for failure in report.failures() {
        warn!(
            target: "otel_lifecycle",
            signal = %failure.signal,
            state = %failure.state,
            error = failure.error.as_deref().unwrap_or("unknown"),
            "Telemetry provider did not shut down cleanly"
        );
    }
}
