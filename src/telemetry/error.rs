//! Telemetry construction errors

use super::signal::Signal;
use thiserror::Error;

/// Errors that can occur while bootstrapping the telemetry subsystem.
///
/// Every variant is a construction-time failure: when one is returned, no
/// provider has been installed in the registry. Runtime export failures never
/// surface through this type.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid resource attribute '{key}': {reason}")]
    ResourceBuild { key: String, reason: String },

    #[error("Failed to initialize {signal} exporter: {reason}")]
    ExporterInit { signal: Signal, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

impl TelemetryError {
    pub(crate) fn resource(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceBuild {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn exporter(signal: Signal, reason: impl ToString) -> Self {
        Self::ExporterInit {
            signal,
            reason: reason.to_string(),
        }
    }

    /// The signal whose exporter failed, if this is an exporter error.
    pub fn signal(&self) -> Option<Signal> {
        match self {
            Self::ExporterInit { signal, .. } => Some(*signal),
            _ => None,
        }
    }
}
