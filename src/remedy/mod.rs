//! Remediation Catalog
//!
//! Severity-appropriate corrective actions. Each action is idempotent, bound
//! to exactly one non-Normal severity, and carries its own success/failure
//! outcome independent of the sampling loop's health.

pub mod executor;
pub mod service;

pub use executor::ActionExecutor;
pub use service::{ServiceControl, SystemctlControl};

use crate::classify::Severity;
use crate::procs::ProcessSelector;

/// A named, idempotent corrective operation
#[derive(Debug, Clone)]
pub enum RemediationAction {
    /// Containment: SIGTERM all workloads matched by the selector
    HaltWorkloads { selector: ProcessSelector },
    /// Drastic: SIGKILL the oldest matching processes, capped at `max_kills`
    KillOldest {
        selector: ProcessSelector,
        max_kills: usize,
    },
    /// Drastic: dispatch a restart command for a dependent service
    RestartService { unit: String },
}

impl RemediationAction {
    /// Stable action name for log entries
    pub fn name(&self) -> &'static str {
        match self {
            RemediationAction::HaltWorkloads { .. } => "halt-workloads",
            RemediationAction::KillOldest { .. } => "kill-oldest",
            RemediationAction::RestartService { .. } => "restart-service",
        }
    }
}

impl std::fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemediationAction::HaltWorkloads { selector } => {
                write!(f, "halt-workloads ({selector})")
            }
            RemediationAction::KillOldest {
                selector,
                max_kills,
            } => write!(f, "kill-oldest (max {max_kills}, {selector})"),
            RemediationAction::RestartService { unit } => write!(f, "restart-service ({unit})"),
        }
    }
}

/// Typed result of one action invocation
///
/// Failures are propagated as values, never as panics or errors escaping the
/// watchdog loop.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Whether the underlying calls all succeeded
    pub ok: bool,
    /// How many target processes were found and acted on
    pub targets: u32,
    /// Free-text diagnostic detail
    pub detail: String,
}

impl Outcome {
    pub fn success(targets: u32, detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            targets,
            detail: detail.into(),
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            targets: 0,
            detail: detail.into(),
        }
    }

    /// An expected-but-empty result: the action ran and found nothing to do
    pub fn no_targets(&self) -> bool {
        self.ok && self.targets == 0
    }
}

/// Mapping from severity to its configured action
///
/// Entries may be absent, meaning "log only". Warn never carries an action;
/// the executor is only consulted for Alert and above.
#[derive(Debug, Clone, Default)]
pub struct RemediationCatalog {
    alert: Option<RemediationAction>,
    critical: Option<RemediationAction>,
}

impl RemediationCatalog {
    pub fn new(
        alert: Option<RemediationAction>,
        critical: Option<RemediationAction>,
    ) -> Self {
        Self { alert, critical }
    }

    /// Action configured for a severity, if any
    pub fn action_for(&self, severity: Severity) -> Option<&RemediationAction> {
        match severity {
            Severity::Normal | Severity::Warn => None,
            Severity::Alert => self.alert.as_ref(),
            Severity::Critical => self.critical.as_ref(),
        }
    }
}
