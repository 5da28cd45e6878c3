pub mod classify;
pub mod config;
pub mod error;
pub mod notify;
pub mod procs;
pub mod remedy;
pub mod shutdown;
pub mod sources;
pub mod watchdog;

pub use classify::{Severity, Thresholds, ThresholdSet};
pub use config::AppConfig;
pub use error::{Result, VigilError};
pub use notify::Notifier;
pub use procs::{
    ProcDirectory, ProcessDirectory, ProcessInfo, ProcessSelector, SignalResult, StopMode,
};
pub use remedy::{
    ActionExecutor, Outcome, RemediationAction, RemediationCatalog, ServiceControl,
    SystemctlControl,
};
pub use shutdown::{install_signal_handlers, Shutdown, ShutdownSignal};
pub use sources::{LivenessLagSource, MemoryPressureSource, MetricSource, Reading, Sample};
pub use watchdog::{TickReport, Watchdog};
