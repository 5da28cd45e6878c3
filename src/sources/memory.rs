//! Memory-Pressure Source
//!
//! Reads instantaneous memory utilization from `/proc/meminfo`. The sample
//! value is the percentage of total memory in use, computed from
//! `MemTotal` and `MemAvailable`.

use super::{MetricSource, Sample};
use std::path::PathBuf;
use tracing::debug;

const PROC_MEMINFO: &str = "/proc/meminfo";

/// Reads host memory utilization percentage
pub struct MemoryPressureSource {
    meminfo_path: PathBuf,
}

impl MemoryPressureSource {
    pub fn new() -> Self {
        Self {
            meminfo_path: PathBuf::from(PROC_MEMINFO),
        }
    }

    #[cfg(test)]
    fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            meminfo_path: path.into(),
        }
    }
}

impl Default for MemoryPressureSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MetricSource for MemoryPressureSource {
    fn signal_name(&self) -> &str {
        "memory usage"
    }

    fn unit(&self) -> &str {
        "%"
    }

    async fn read(&mut self) -> Sample {
        let contents = match tokio::fs::read_to_string(&self.meminfo_path).await {
            Ok(contents) => contents,
            Err(e) => {
                return Sample::unavailable(format!(
                    "cannot read {}: {}",
                    self.meminfo_path.display(),
                    e
                ))
            }
        };

        match parse_meminfo(&contents) {
            Ok(stats) => {
                debug!(
                    used_pct = format!("{:.1}", stats.used_pct()),
                    available_gb = format!("{:.2}", stats.available_gb()),
                    "memory sampled"
                );
                Sample::value(stats.used_pct())
            }
            Err(reason) => Sample::unavailable(reason),
        }
    }
}

/// Parsed memory counters (kB, as reported by the kernel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemStats {
    pub total_kb: u64,
    pub available_kb: u64,
}

impl MemStats {
    /// Percentage of total memory in use
    pub fn used_pct(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        let used = self.total_kb.saturating_sub(self.available_kb);
        (used as f64 / self.total_kb as f64) * 100.0
    }

    /// Available headroom in GB
    pub fn available_gb(&self) -> f64 {
        self.available_kb as f64 / (1024.0 * 1024.0)
    }
}

/// Parse `MemTotal` and `MemAvailable` out of /proc/meminfo contents
fn parse_meminfo(contents: &str) -> Result<MemStats, String> {
    let mut total_kb = None;
    let mut available_kb = None;

    for line in contents.lines() {
        let mut fields = line.split_whitespace();
        let key = fields.next().unwrap_or_default();
        let value = fields.next().unwrap_or_default();
        if key == "MemTotal:" {
            total_kb = Some(parse_kb_field("MemTotal", value)?);
        } else if key == "MemAvailable:" {
            available_kb = Some(parse_kb_field("MemAvailable", value)?);
        }
        if total_kb.is_some() && available_kb.is_some() {
            break;
        }
    }

    let total_kb = total_kb.ok_or_else(|| "MemTotal field missing in meminfo".to_string())?;
    let available_kb =
        available_kb.ok_or_else(|| "MemAvailable field missing in meminfo".to_string())?;

    Ok(MemStats {
        total_kb,
        available_kb,
    })
}

fn parse_kb_field(field: &str, value: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|e| format!("unparsable {field} value {value:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::Reading;

    const MEMINFO: &str = "\
MemTotal:       16000000 kB
MemFree:          600000 kB
MemAvailable:    4000000 kB
Buffers:          200000 kB
Cached:          3000000 kB
";

    #[test]
    fn test_parse_meminfo() {
        let stats = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(stats.total_kb, 16_000_000);
        assert_eq!(stats.available_kb, 4_000_000);
        assert!((stats.used_pct() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_meminfo_missing_field() {
        let err = parse_meminfo("MemTotal: 1000 kB\n").unwrap_err();
        assert!(err.contains("MemAvailable"));
    }

    #[test]
    fn test_parse_meminfo_garbage_value() {
        let err = parse_meminfo("MemTotal: lots kB\nMemAvailable: 10 kB\n").unwrap_err();
        assert!(err.contains("MemTotal"));
    }

    #[test]
    fn test_used_pct_zero_total() {
        let stats = MemStats {
            total_kb: 0,
            available_kb: 0,
        };
        assert_eq!(stats.used_pct(), 0.0);
    }

    #[tokio::test]
    async fn test_unreadable_meminfo_yields_invalid_sample() {
        let mut source = MemoryPressureSource::with_path("/nonexistent/meminfo");
        let sample = source.read().await;
        assert!(matches!(sample.reading, Reading::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_meminfo_file_yields_used_pct() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{MEMINFO}").unwrap();
        file.flush().unwrap();

        let mut source = MemoryPressureSource::with_path(file.path());
        let sample = source.read().await;
        match sample.reading {
            Reading::Value(pct) => assert!((pct - 75.0).abs() < 1e-9),
            Reading::Unavailable { reason } => panic!("unexpected invalid sample: {reason}"),
        }
    }
}
