//! Process Directory
//!
//! Enumerates live processes (pid, name, start time, command line) and
//! delivers termination signals. The live implementation walks /proc and
//! signals through `nix`; remediation code depends only on the
//! [`ProcessDirectory`] trait so the matching and kill policies are testable
//! without touching real processes.

pub mod selector;

pub use selector::ProcessSelector;

use crate::error::{Result, VigilError};
use std::fs;
use std::path::Path;
use tracing::trace;

/// One live process as seen in the snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: i32,
    /// Executable name (comm)
    pub name: String,
    /// Full command line, space-joined
    pub cmdline: String,
    /// Process start time in clock ticks since boot; lower = older
    pub start_ticks: u64,
}

/// Result of delivering a signal to one pid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalResult {
    /// Signal was delivered
    Delivered,
    /// Target exited between discovery and signaling; expected, not an error
    Vanished,
}

/// How to stop a target process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// SIGTERM, graceful terminate
    Graceful,
    /// SIGKILL, forced kill
    Forced,
}

/// Enumerate and signal live processes
pub trait ProcessDirectory: Send + Sync {
    /// Snapshot all live processes
    fn snapshot(&self) -> Result<Vec<ProcessInfo>>;

    /// Deliver a stop signal to one pid
    fn stop(&self, pid: i32, mode: StopMode) -> Result<SignalResult>;

    /// Pid of the calling process, excluded from all remediation
    fn own_pid(&self) -> i32;
}

/// Live /proc-backed process directory
pub struct ProcDirectory {
    proc_root: &'static str,
}

impl ProcDirectory {
    pub fn new() -> Self {
        Self { proc_root: "/proc" }
    }
}

impl Default for ProcDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessDirectory for ProcDirectory {
    fn snapshot(&self) -> Result<Vec<ProcessInfo>> {
        let entries = fs::read_dir(self.proc_root)
            .map_err(|e| VigilError::ProcessEnumeration(format!("read_dir /proc: {e}")))?;

        let mut processes = Vec::new();
        for entry in entries.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.parse::<i32>().ok())
            else {
                continue;
            };

            // Processes may exit mid-walk; skip unreadable entries.
            match read_process_info(&entry.path(), pid) {
                Some(info) => processes.push(info),
                None => trace!(pid, "process vanished during enumeration"),
            }
        }

        Ok(processes)
    }

    #[cfg(unix)]
    fn stop(&self, pid: i32, mode: StopMode) -> Result<SignalResult> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let sig = match mode {
            StopMode::Graceful => Signal::SIGTERM,
            StopMode::Forced => Signal::SIGKILL,
        };

        match kill(Pid::from_raw(pid), sig) {
            Ok(()) => Ok(SignalResult::Delivered),
            Err(Errno::ESRCH) => Ok(SignalResult::Vanished),
            Err(e) => Err(VigilError::SignalDelivery {
                pid,
                reason: e.to_string(),
            }),
        }
    }

    #[cfg(not(unix))]
    fn stop(&self, pid: i32, _mode: StopMode) -> Result<SignalResult> {
        Err(VigilError::SignalDelivery {
            pid,
            reason: "signal delivery not supported on this platform".to_string(),
        })
    }

    fn own_pid(&self) -> i32 {
        std::process::id() as i32
    }
}

/// Read name, start time and cmdline for one /proc/<pid> entry
///
/// Returns None when the process exits mid-read or its stat line cannot be
/// parsed; enumeration races are expected and tolerated.
fn read_process_info(proc_dir: &Path, pid: i32) -> Option<ProcessInfo> {
    let stat = fs::read_to_string(proc_dir.join("stat")).ok()?;
    let (name, start_ticks) = parse_stat_line(&stat)?;

    let cmdline = fs::read(proc_dir.join("cmdline"))
        .ok()
        .map(|raw| {
            raw.split(|b| *b == 0)
                .filter(|part| !part.is_empty())
                .map(|part| String::from_utf8_lossy(part).into_owned())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    Some(ProcessInfo {
        pid,
        name,
        cmdline,
        start_ticks,
    })
}

/// Parse comm and starttime (field 22) from a /proc/<pid>/stat line
///
/// comm is parenthesized and may itself contain spaces or parens, so the
/// split point is the last closing paren.
fn parse_stat_line(stat: &str) -> Option<(String, u64)> {
    let open = stat.find('(')?;
    let close = stat.rfind(')')?;
    let name = stat.get(open + 1..close)?.to_string();

    // Fields after comm: state is field 3, starttime is field 22.
    let rest = stat.get(close + 1..)?;
    let start_ticks = rest.split_whitespace().nth(19)?.parse::<u64>().ok()?;

    Some((name, start_ticks))
}
