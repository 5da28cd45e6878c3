//! Metric Sources
//!
//! A metric source reads the current value of a monitored scalar signal.
//! Sources never error to the caller: any underlying failure (missing file,
//! malformed content, host API failure) is surfaced as an invalid sample and
//! logged by the watchdog loop.

pub mod liveness;
pub mod memory;

pub use liveness::LivenessLagSource;
pub use memory::MemoryPressureSource;

use chrono::{DateTime, Utc};

/// Outcome of one metric read
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// The signal was read successfully
    Value(f64),
    /// The underlying source could not be read this tick
    Unavailable { reason: String },
}

/// One timestamped reading of the monitored signal
///
/// Created fresh each tick and discarded after classification.
#[derive(Debug, Clone)]
pub struct Sample {
    pub taken_at: DateTime<Utc>,
    pub reading: Reading,
}

impl Sample {
    /// Build a valid sample from a freshly read value
    pub fn value(value: f64) -> Self {
        Self {
            taken_at: Utc::now(),
            reading: Reading::Value(value),
        }
    }

    /// Build an invalid sample carrying the failure reason
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            taken_at: Utc::now(),
            reading: Reading::Unavailable {
                reason: reason.into(),
            },
        }
    }
}

/// Abstracts "read current value of the monitored signal"
#[async_trait::async_trait]
pub trait MetricSource: Send {
    /// Human-readable name of the signal, used in log entries
    fn signal_name(&self) -> &str;

    /// Unit label for the signal value (e.g. "s", "%")
    fn unit(&self) -> &str;

    /// Read the current signal value; never errors
    async fn read(&mut self) -> Sample;
}
