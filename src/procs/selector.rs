//! Process Selector
//!
//! Declarative selector for remediation targets: a list of name patterns plus
//! an exclusion list, evaluated against a process snapshot. Keeping the
//! matching policy here makes it testable in isolation from the live /proc
//! directory.

use super::ProcessInfo;
use serde::Deserialize;

/// Declarative selector for remediation target processes
///
/// A process matches when any pattern appears (case-insensitive) in its name
/// or command line, and no exclusion pattern does. The exclusion list is how
/// named-critical processes are protected; the watchdog's own process is
/// excluded separately by pid at snapshot time.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProcessSelector {
    /// Substring patterns identifying targets
    pub patterns: Vec<String>,
    /// Substring patterns for processes that must never be targeted
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ProcessSelector {
    pub fn new(patterns: Vec<String>, exclude: Vec<String>) -> Self {
        Self { patterns, exclude }
    }

    /// Whether a process is a remediation target under this selector
    pub fn matches(&self, process: &ProcessInfo) -> bool {
        let name = process.name.to_lowercase();
        let cmdline = process.cmdline.to_lowercase();

        let selected = self
            .patterns
            .iter()
            .any(|p| contains_pattern(&name, &cmdline, p));
        if !selected {
            return false;
        }

        !self
            .exclude
            .iter()
            .any(|p| contains_pattern(&name, &cmdline, p))
    }

    /// Filter a snapshot down to matching processes, dropping `own_pid`
    pub fn select<'a>(
        &self,
        snapshot: &'a [ProcessInfo],
        own_pid: i32,
    ) -> Vec<&'a ProcessInfo> {
        snapshot
            .iter()
            .filter(|p| p.pid != own_pid && self.matches(p))
            .collect()
    }
}

fn contains_pattern(name: &str, cmdline: &str, pattern: &str) -> bool {
    let pattern = pattern.to_lowercase();
    !pattern.is_empty() && (name.contains(&pattern) || cmdline.contains(&pattern))
}

impl std::fmt::Display for ProcessSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "patterns=[{}] exclude=[{}]",
            self.patterns.join(", "),
            self.exclude.join(", ")
        )
    }
}
