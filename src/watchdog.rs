//! Watchdog Loop
//!
//! Orchestrates fixed-interval sampling, classification and remediation for
//! one monitored signal. Each tick runs sample → classify → (log, remediate)
//! → sleep; invalid samples skip straight to logging. Nothing below the loop
//! boundary terminates the daemon: source failures become invalid samples,
//! action failures become failed outcomes, and the loop simply continues to
//! the next tick. Cancellation is cooperative, checked between ticks.

use crate::classify::{Severity, ThresholdSet};
use crate::notify::Notifier;
use crate::remedy::{ActionExecutor, Outcome, RemediationCatalog};
use crate::shutdown::ShutdownSignal;
use crate::sources::{MetricSource, Reading, Sample};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// What one tick observed and did, for logging and tests
#[derive(Debug)]
pub struct TickReport {
    pub sample: Sample,
    /// None when the sample was invalid and classification was skipped
    pub severity: Option<Severity>,
    /// Present only when a configured action was invoked
    pub outcome: Option<Outcome>,
}

/// One watchdog instance: a metric source paired with thresholds and a
/// remediation catalog
pub struct Watchdog {
    instance: String,
    source: Box<dyn MetricSource>,
    interval: Duration,
    thresholds: ThresholdSet,
    catalog: RemediationCatalog,
    executor: ActionExecutor,
    notifier: Option<Arc<Notifier>>,
}

impl Watchdog {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instance: impl Into<String>,
        source: Box<dyn MetricSource>,
        interval: Duration,
        thresholds: ThresholdSet,
        catalog: RemediationCatalog,
        executor: ActionExecutor,
        notifier: Option<Arc<Notifier>>,
    ) -> Self {
        Self {
            instance: instance.into(),
            source,
            interval,
            thresholds,
            catalog,
            executor,
            notifier,
        }
    }

    /// Run the sampling loop until a shutdown signal arrives
    ///
    /// The current tick always completes before the loop exits.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<ShutdownSignal>) {
        info!(
            instance = %self.instance,
            signal = self.source.signal_name(),
            interval_secs = self.interval.as_secs(),
            warn = self.thresholds.boundary(Severity::Warn),
            alert = self.thresholds.boundary(Severity::Alert),
            critical = self.thresholds.boundary(Severity::Critical),
            "watchdog started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick fires immediately; sample right away.
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    info!(instance = %self.instance, "watchdog stopping");
                    break;
                }
            }
        }

        info!(instance = %self.instance, "watchdog stopped");
    }

    /// Run one sample → classify → remediate cycle
    pub async fn tick(&mut self) -> TickReport {
        let sample = self.source.read().await;

        let value = match &sample.reading {
            Reading::Unavailable { reason } => {
                warn!(
                    instance = %self.instance,
                    signal = self.source.signal_name(),
                    %reason,
                    "sample unavailable, skipping classification"
                );
                return TickReport {
                    sample,
                    severity: None,
                    outcome: None,
                };
            }
            Reading::Value(value) => *value,
        };

        let severity = self.thresholds.classify(value);
        self.log_classification(severity, value);

        if severity >= Severity::Alert {
            if let Some(notifier) = &self.notifier {
                let message = format!(
                    "{} {:.1}{}",
                    self.source.signal_name(),
                    value,
                    self.source.unit()
                );
                notifier.notify(&self.instance, severity, &message).await;
            }
        }

        let outcome = match self.catalog.action_for(severity) {
            Some(action) if severity >= Severity::Alert => {
                warn!(
                    instance = %self.instance,
                    %severity,
                    action = action.name(),
                    "invoking remediation"
                );
                let outcome = self.executor.invoke(action).await;
                self.log_outcome(action.name(), &outcome);
                Some(outcome)
            }
            _ => None,
        };

        TickReport {
            sample,
            severity: Some(severity),
            outcome,
        }
    }

    fn log_classification(&self, severity: Severity, value: f64) {
        let signal = self.source.signal_name();
        let unit = self.source.unit();
        let boundary = self.thresholds.boundary(severity);

        match severity {
            // A healthy tick leaves no trace; logging starts at Warn.
            Severity::Normal => {}
            Severity::Warn => {
                warn!(
                    instance = %self.instance,
                    "{signal}: {value:.1}{unit} (threshold: {}{unit})",
                    boundary.unwrap_or_default()
                );
            }
            Severity::Alert | Severity::Critical => {
                error!(
                    instance = %self.instance,
                    %severity,
                    "{signal}: {value:.1}{unit} (threshold: {}{unit})",
                    boundary.unwrap_or_default()
                );
            }
        }
    }

    fn log_outcome(&self, action: &str, outcome: &Outcome) {
        if !outcome.ok {
            error!(
                instance = %self.instance,
                action,
                detail = %outcome.detail,
                "remediation failed"
            );
        } else if outcome.no_targets() {
            warn!(
                instance = %self.instance,
                action,
                detail = %outcome.detail,
                "remediation found no targets"
            );
        } else {
            info!(
                instance = %self.instance,
                action,
                targets = outcome.targets,
                detail = %outcome.detail,
                "remediation succeeded"
            );
        }
    }
}
