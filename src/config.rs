//! Configuration
//!
//! Layered configuration: `default.toml` in the config directory, overridden
//! by `VIGIL`-prefixed environment variables. Loaded once at daemon start
//! into an immutable value; there is no hot reload.

use crate::classify::{Thresholds, ThresholdSet};
use crate::procs::ProcessSelector;
use crate::remedy::{RemediationAction, RemediationCatalog};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub liveness: LivenessConfig,
    pub memory: MemoryConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Upper bound on one remediation action invocation, in seconds
    #[serde(default = "default_action_timeout")]
    pub action_timeout_secs: u64,
}

/// Liveness-lag watchdog instance
#[derive(Debug, Clone, Deserialize)]
pub struct LivenessConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds between samples
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Persisted liveness-state file written by the external heartbeat process
    pub state_file: String,
    /// Lag thresholds in seconds
    pub thresholds: Thresholds,
    /// Dependent service to restart at Critical (absent = log only)
    #[serde(default)]
    pub restart_unit: Option<String>,
}

/// Memory-pressure watchdog instance
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds between samples
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Usage thresholds in percent
    pub thresholds: Thresholds,
    /// Containment selector for Alert (absent = log only)
    #[serde(default)]
    pub contain: Option<ProcessSelector>,
    /// Drastic kill policy for Critical (absent = log only)
    #[serde(default)]
    pub drastic: Option<KillPolicy>,
}

/// Victim selection for the Critical kill action
#[derive(Debug, Clone, Deserialize)]
pub struct KillPolicy {
    pub patterns: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Cap on processes killed per invocation, oldest first
    #[serde(default = "default_max_kills")]
    pub max_kills: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotifyConfig {
    /// Webhook URL for Alert/Critical events (also via VIGIL_WEBHOOK_URL)
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Minimum interval between repeat notifications per instance+severity
    #[serde(default = "default_notify_interval")]
    pub min_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    5
}

fn default_action_timeout() -> u64 {
    10
}

fn default_max_kills() -> usize {
    3
}

fn default_notify_interval() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("action_timeout_secs", default_action_timeout() as i64)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Override with environment variables (VIGIL_MEMORY__INTERVAL_SECS, etc.)
            .add_source(
                Environment::with_prefix("VIGIL")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values, collecting all errors
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.liveness.enabled && !self.memory.enabled {
            errors.push("at least one watchdog instance must be enabled".to_string());
        }

        if self.action_timeout_secs == 0 {
            errors.push("action_timeout_secs must be positive".to_string());
        }

        if self.liveness.interval_secs == 0 {
            errors.push("liveness.interval_secs must be positive".to_string());
        }
        if self.memory.interval_secs == 0 {
            errors.push("memory.interval_secs must be positive".to_string());
        }

        if let Err(e) = ThresholdSet::new(self.liveness.thresholds) {
            errors.push(format!("liveness.thresholds: {e}"));
        }
        if let Err(e) = ThresholdSet::new(self.memory.thresholds) {
            errors.push(format!("memory.thresholds: {e}"));
        }

        if self.liveness.state_file.trim().is_empty() {
            errors.push("liveness.state_file must not be empty".to_string());
        }

        if let Some(unit) = &self.liveness.restart_unit {
            if unit.trim().is_empty() {
                errors.push("liveness.restart_unit must not be empty".to_string());
            }
        }

        if let Some(contain) = &self.memory.contain {
            if contain.patterns.is_empty() {
                errors.push("memory.contain.patterns must not be empty".to_string());
            }
        }

        if let Some(drastic) = &self.memory.drastic {
            if drastic.patterns.is_empty() {
                errors.push("memory.drastic.patterns must not be empty".to_string());
            }
            if drastic.max_kills == 0 {
                errors.push("memory.drastic.max_kills must be positive".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl LivenessConfig {
    /// Remediation catalog for the liveness instance
    ///
    /// Warn and Alert are log-only; Critical optionally restarts the
    /// dependent service.
    pub fn catalog(&self) -> RemediationCatalog {
        RemediationCatalog::new(
            None,
            self.restart_unit
                .clone()
                .map(|unit| RemediationAction::RestartService { unit }),
        )
    }
}

impl MemoryConfig {
    /// Remediation catalog for the memory instance
    pub fn catalog(&self) -> RemediationCatalog {
        RemediationCatalog::new(
            self.contain
                .clone()
                .map(|selector| RemediationAction::HaltWorkloads { selector }),
            self.drastic.clone().map(|policy| RemediationAction::KillOldest {
                selector: ProcessSelector::new(policy.patterns, policy.exclude),
                max_kills: policy.max_kills,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Severity;
    use std::io::Write;

    fn write_config(dir: &Path, contents: &str) {
        let mut file = std::fs::File::create(dir.join("default.toml")).unwrap();
        write!(file, "{contents}").unwrap();
    }

    const VALID_CONFIG: &str = r#"
[liveness]
state_file = "memory/heartbeat-state.json"
restart_unit = "openclaw-gateway"

[liveness.thresholds]
warn = 30.0
alert = 60.0
critical = 120.0

[memory]
interval_secs = 5

[memory.thresholds]
warn = 80.0
alert = 90.0
critical = 95.0

[memory.contain]
patterns = ["lead-scraper", "backtest", "research-shadow"]

[memory.drastic]
patterns = ["python"]
exclude = ["brain-api", "vigil"]
max_kills = 3
"#;

    #[test]
    fn test_load_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), VALID_CONFIG);

        let cfg = AppConfig::load_from(dir.path()).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.liveness.interval_secs, 5);
        assert_eq!(cfg.liveness.thresholds.critical, 120.0);
        assert_eq!(cfg.memory.drastic.as_ref().unwrap().max_kills, 3);
        assert_eq!(cfg.action_timeout_secs, 10);
    }

    #[test]
    fn test_catalogs_from_config() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), VALID_CONFIG);
        let cfg = AppConfig::load_from(dir.path()).unwrap();

        let liveness = cfg.liveness.catalog();
        assert!(liveness.action_for(Severity::Alert).is_none());
        assert!(matches!(
            liveness.action_for(Severity::Critical),
            Some(RemediationAction::RestartService { unit }) if unit == "openclaw-gateway"
        ));

        let memory = cfg.memory.catalog();
        assert!(matches!(
            memory.action_for(Severity::Alert),
            Some(RemediationAction::HaltWorkloads { .. })
        ));
        assert!(matches!(
            memory.action_for(Severity::Critical),
            Some(RemediationAction::KillOldest { max_kills: 3, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
[liveness]
state_file = "hb.json"

[liveness.thresholds]
warn = 60.0
alert = 30.0
critical = 120.0

[memory]

[memory.thresholds]
warn = 80.0
alert = 90.0
critical = 95.0
"#,
        );

        let cfg = AppConfig::load_from(dir.path()).unwrap();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("liveness.thresholds")));
    }

    #[test]
    fn test_validate_rejects_zero_max_kills() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            r#"
[liveness]
state_file = "hb.json"

[liveness.thresholds]
warn = 30.0
alert = 60.0
critical = 120.0

[memory]

[memory.thresholds]
warn = 80.0
alert = 90.0
critical = 95.0

[memory.drastic]
patterns = ["python"]
max_kills = 0
"#,
        );

        let cfg = AppConfig::load_from(dir.path()).unwrap();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("max_kills")));
    }
}
