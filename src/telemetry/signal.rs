//! Telemetry signal kinds

use std::fmt;

/// One of the three telemetry pipelines managed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Trace,
    Metric,
    Log,
}

impl Signal {
    /// All signals in bootstrap (and shutdown) order.
    pub const ALL: [Signal; 3] = [Signal::Trace, Signal::Metric, Signal::Log];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Trace => "trace",
            Signal::Metric => "metric",
            Signal::Log => "log",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
