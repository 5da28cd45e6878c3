//! Action Executor
//!
//! Invokes remediation actions and isolates their failures from the sampling
//! loop. Every underlying error (a vanished target, permission denied, a
//! rejected service-manager command, a stuck action hitting its timeout) is
//! captured as a failed [`Outcome`] and never propagates upward.

use super::service::ServiceControl;
use super::{Outcome, RemediationAction};
use crate::procs::{ProcessDirectory, ProcessInfo, ProcessSelector, SignalResult, StopMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Executes remediation actions with bounded duration
pub struct ActionExecutor {
    procs: Arc<dyn ProcessDirectory>,
    services: Arc<dyn ServiceControl>,
    action_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(
        procs: Arc<dyn ProcessDirectory>,
        services: Arc<dyn ServiceControl>,
        action_timeout: Duration,
    ) -> Self {
        Self {
            procs,
            services,
            action_timeout,
        }
    }

    /// Invoke one action; all failure modes come back as an Outcome
    pub async fn invoke(&self, action: &RemediationAction) -> Outcome {
        match timeout(self.action_timeout, self.dispatch(action)).await {
            Ok(outcome) => outcome,
            Err(_) => Outcome::failure(format!(
                "{} timed out after {}s",
                action.name(),
                self.action_timeout.as_secs()
            )),
        }
    }

    async fn dispatch(&self, action: &RemediationAction) -> Outcome {
        match action {
            RemediationAction::HaltWorkloads { selector } => {
                self.run_blocking(selector.clone(), StopMode::Graceful, None)
                    .await
            }
            RemediationAction::KillOldest {
                selector,
                max_kills,
            } => {
                self.run_blocking(selector.clone(), StopMode::Forced, Some(*max_kills))
                    .await
            }
            RemediationAction::RestartService { unit } => match self.services.restart(unit).await
            {
                Ok(()) => Outcome::success(1, format!("restart command sent to {unit}")),
                Err(e) => Outcome::failure(e.to_string()),
            },
        }
    }

    /// Run a process-directory action off the async runtime
    async fn run_blocking(
        &self,
        selector: ProcessSelector,
        mode: StopMode,
        cap: Option<usize>,
    ) -> Outcome {
        let procs = self.procs.clone();
        match tokio::task::spawn_blocking(move || stop_matching(&*procs, &selector, mode, cap))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => Outcome::failure(format!("action task failed: {e}")),
        }
    }
}

/// Signal every selector match (optionally capped, oldest first)
///
/// With a cap, matches are ordered by process start time ascending so the
/// oldest are stopped first. Targets that exit between discovery and the
/// signal call are expected races, counted but not errors.
fn stop_matching(
    procs: &dyn ProcessDirectory,
    selector: &ProcessSelector,
    mode: StopMode,
    cap: Option<usize>,
) -> Outcome {
    let snapshot = match procs.snapshot() {
        Ok(snapshot) => snapshot,
        Err(e) => return Outcome::failure(format!("process enumeration failed: {e}")),
    };

    let mut matched: Vec<&ProcessInfo> = selector.select(&snapshot, procs.own_pid());
    if matched.is_empty() {
        return Outcome::success(0, "no matching processes");
    }

    if let Some(cap) = cap {
        matched.sort_by_key(|p| p.start_ticks);
        matched.truncate(cap);
    }

    let mut stopped = Vec::new();
    let mut vanished = 0u32;
    let mut errors = Vec::new();

    for target in matched {
        match procs.stop(target.pid, mode) {
            Ok(SignalResult::Delivered) => {
                stopped.push(format!("{} (PID {})", target.name, target.pid));
            }
            Ok(SignalResult::Vanished) => vanished += 1,
            Err(e) => errors.push(e.to_string()),
        }
    }

    let mut detail = if stopped.is_empty() {
        "no processes signaled".to_string()
    } else {
        format!("signaled: {}", stopped.join(", "))
    };
    if vanished > 0 {
        detail.push_str(&format!(" ({vanished} vanished before signal)"));
    }

    if errors.is_empty() {
        Outcome::success(stopped.len() as u32, detail)
    } else {
        Outcome::failure(format!("{detail}; errors: {}", errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, VigilError};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct FakeProcs {
        processes: Vec<ProcessInfo>,
        vanished: HashSet<i32>,
        denied: HashSet<i32>,
        signaled: Mutex<Vec<(i32, StopMode)>>,
    }

    impl FakeProcs {
        fn new(processes: Vec<ProcessInfo>) -> Self {
            Self {
                processes,
                vanished: HashSet::new(),
                denied: HashSet::new(),
                signaled: Mutex::new(Vec::new()),
            }
        }

        fn signaled_pids(&self) -> Vec<i32> {
            self.signaled.lock().unwrap().iter().map(|(p, _)| *p).collect()
        }
    }

    impl ProcessDirectory for FakeProcs {
        fn snapshot(&self) -> Result<Vec<ProcessInfo>> {
            Ok(self.processes.clone())
        }

        fn stop(&self, pid: i32, mode: StopMode) -> Result<SignalResult> {
            if self.denied.contains(&pid) {
                return Err(VigilError::SignalDelivery {
                    pid,
                    reason: "Operation not permitted".into(),
                });
            }
            if self.vanished.contains(&pid) {
                return Ok(SignalResult::Vanished);
            }
            self.signaled.lock().unwrap().push((pid, mode));
            Ok(SignalResult::Delivered)
        }

        fn own_pid(&self) -> i32 {
            1
        }
    }

    struct FakeServices {
        fail: bool,
        delay: Option<Duration>,
        restarted: Mutex<Vec<String>>,
    }

    impl FakeServices {
        fn ok() -> Self {
            Self {
                fail: false,
                delay: None,
                restarted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ServiceControl for FakeServices {
        async fn restart(&self, unit: &str) -> Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(VigilError::ServiceControl {
                    unit: unit.to_string(),
                    reason: "command rejected".into(),
                });
            }
            self.restarted.lock().unwrap().push(unit.to_string());
            Ok(())
        }
    }

    fn proc(pid: i32, name: &str, start_ticks: u64) -> ProcessInfo {
        ProcessInfo {
            pid,
            name: name.to_string(),
            cmdline: name.to_string(),
            start_ticks,
        }
    }

    fn executor(procs: Arc<FakeProcs>, services: Arc<FakeServices>) -> ActionExecutor {
        ActionExecutor::new(procs, services, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_halt_reports_zero_targets_as_ok() {
        let procs = Arc::new(FakeProcs::new(vec![proc(10, "web-server", 1)]));
        let exec = executor(procs, Arc::new(FakeServices::ok()));

        let outcome = exec
            .invoke(&RemediationAction::HaltWorkloads {
                selector: ProcessSelector::new(vec!["backtest".into()], vec![]),
            })
            .await;

        assert!(outcome.ok);
        assert!(outcome.no_targets());
    }

    #[tokio::test]
    async fn test_halt_terminates_matches_gracefully() {
        let procs = Arc::new(FakeProcs::new(vec![
            proc(10, "backtest-a", 1),
            proc(11, "backtest-b", 2),
            proc(12, "web-server", 3),
        ]));
        let exec = executor(procs.clone(), Arc::new(FakeServices::ok()));

        let outcome = exec
            .invoke(&RemediationAction::HaltWorkloads {
                selector: ProcessSelector::new(vec!["backtest".into()], vec![]),
            })
            .await;

        assert!(outcome.ok);
        assert_eq!(outcome.targets, 2);
        let signaled = procs.signaled.lock().unwrap();
        assert!(signaled.iter().all(|(_, mode)| *mode == StopMode::Graceful));
    }

    #[tokio::test]
    async fn test_kill_oldest_caps_and_orders_oldest_first() {
        let procs = Arc::new(FakeProcs::new(vec![
            proc(20, "python-d", 400),
            proc(21, "python-a", 100),
            proc(22, "python-c", 300),
            proc(23, "python-b", 200),
            proc(24, "brain-api", 50),
        ]));
        let exec = executor(procs.clone(), Arc::new(FakeServices::ok()));

        let outcome = exec
            .invoke(&RemediationAction::KillOldest {
                selector: ProcessSelector::new(
                    vec!["python".into(), "brain".into()],
                    vec!["brain-api".into()],
                ),
                max_kills: 3,
            })
            .await;

        assert!(outcome.ok);
        assert_eq!(outcome.targets, 3);
        // Oldest eligible first; the excluded critical process is untouched.
        assert_eq!(procs.signaled_pids(), vec![21, 23, 22]);
    }

    #[tokio::test]
    async fn test_kill_already_gone_target_is_a_noop() {
        let mut fake = FakeProcs::new(vec![proc(30, "python-x", 10)]);
        fake.vanished.insert(30);
        let procs = Arc::new(fake);
        let exec = executor(procs.clone(), Arc::new(FakeServices::ok()));

        let action = RemediationAction::KillOldest {
            selector: ProcessSelector::new(vec!["python".into()], vec![]),
            max_kills: 3,
        };

        // Idempotent: repeated invocation produces no additional side effects.
        let first = exec.invoke(&action).await;
        let second = exec.invoke(&action).await;
        assert!(first.ok && second.ok);
        assert_eq!(first.targets, 0);
        assert!(procs.signaled_pids().is_empty());
    }

    #[tokio::test]
    async fn test_permission_denied_is_failed_outcome() {
        let mut fake = FakeProcs::new(vec![proc(40, "backtest", 10)]);
        fake.denied.insert(40);
        let exec = executor(Arc::new(fake), Arc::new(FakeServices::ok()));

        let outcome = exec
            .invoke(&RemediationAction::HaltWorkloads {
                selector: ProcessSelector::new(vec!["backtest".into()], vec![]),
            })
            .await;

        assert!(!outcome.ok);
        assert!(outcome.detail.contains("not permitted"));
    }

    #[tokio::test]
    async fn test_restart_service_success_and_failure() {
        let services = Arc::new(FakeServices::ok());
        let exec = executor(Arc::new(FakeProcs::new(vec![])), services.clone());

        let outcome = exec
            .invoke(&RemediationAction::RestartService {
                unit: "gateway".into(),
            })
            .await;
        assert!(outcome.ok);
        assert_eq!(services.restarted.lock().unwrap().as_slice(), ["gateway"]);

        let failing = Arc::new(FakeServices {
            fail: true,
            delay: None,
            restarted: Mutex::new(Vec::new()),
        });
        let exec = executor(Arc::new(FakeProcs::new(vec![])), failing);
        let outcome = exec
            .invoke(&RemediationAction::RestartService {
                unit: "gateway".into(),
            })
            .await;
        assert!(!outcome.ok);
        assert!(outcome.detail.contains("command rejected"));
    }

    #[tokio::test]
    async fn test_stuck_action_hits_timeout() {
        let stuck = Arc::new(FakeServices {
            fail: false,
            delay: Some(Duration::from_secs(60)),
            restarted: Mutex::new(Vec::new()),
        });
        let exec = ActionExecutor::new(
            Arc::new(FakeProcs::new(vec![])),
            stuck,
            Duration::from_millis(50),
        );

        let outcome = exec
            .invoke(&RemediationAction::RestartService {
                unit: "gateway".into(),
            })
            .await;
        assert!(!outcome.ok);
        assert!(outcome.detail.contains("timed out"));
    }
}
