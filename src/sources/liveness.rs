//! Liveness-Lag Source
//!
//! Derives heartbeat lag from a persisted liveness-state file written by an
//! external heartbeat process. The file is JSON with at least a
//! `last_heartbeat` field holding either an RFC 3339 timestamp with offset or
//! a numeric epoch-seconds value. An absent or malformed file is a valid,
//! expected condition and yields an invalid sample, not an error.

use super::{MetricSource, Sample};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Reads heartbeat lag (seconds since last heartbeat) from persisted state
pub struct LivenessLagSource {
    state_file: PathBuf,
}

impl LivenessLagSource {
    pub fn new(state_file: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
        }
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }
}

#[async_trait::async_trait]
impl MetricSource for LivenessLagSource {
    fn signal_name(&self) -> &str {
        "heartbeat lag"
    }

    fn unit(&self) -> &str {
        "s"
    }

    async fn read(&mut self) -> Sample {
        let contents = match tokio::fs::read_to_string(&self.state_file).await {
            Ok(contents) => contents,
            Err(e) => {
                return Sample::unavailable(format!(
                    "cannot read {}: {}",
                    self.state_file.display(),
                    e
                ))
            }
        };

        match parse_last_heartbeat(&contents) {
            Ok(last) => {
                let lag = (Utc::now() - last).num_milliseconds() as f64 / 1000.0;
                Sample::value(lag)
            }
            Err(reason) => Sample::unavailable(format!(
                "{}: {}",
                self.state_file.display(),
                reason
            )),
        }
    }
}

/// Parse the `last_heartbeat` field out of liveness-state JSON
///
/// Accepts either an RFC 3339 timestamp string or a numeric epoch-seconds
/// value (fractional seconds allowed).
fn parse_last_heartbeat(contents: &str) -> Result<DateTime<Utc>, String> {
    let state: serde_json::Value =
        serde_json::from_str(contents).map_err(|e| format!("malformed JSON: {e}"))?;

    let field = state
        .get("last_heartbeat")
        .ok_or_else(|| "missing last_heartbeat field".to_string())?;

    match field {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| format!("unparsable timestamp {s:?}: {e}")),
        serde_json::Value::Number(n) => {
            let epoch = n
                .as_f64()
                .ok_or_else(|| format!("unparsable epoch value {n}"))?;
            let secs = epoch.trunc() as i64;
            let nanos = (epoch.fract() * 1e9) as u32;
            DateTime::from_timestamp(secs, nanos)
                .ok_or_else(|| format!("epoch value {epoch} out of range"))
        }
        other => Err(format!("last_heartbeat has unsupported type: {other}")),
    }
}
