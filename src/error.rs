use thiserror::Error;

/// Main error type for the watchdog daemon
#[derive(Error, Debug)]
pub enum VigilError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    // Process directory errors
    #[error("Process enumeration failed: {0}")]
    ProcessEnumeration(String),

    #[error("Signal delivery failed for pid {pid}: {reason}")]
    SignalDelivery { pid: i32, reason: String },

    // Service control errors
    #[error("Service control failed for {unit}: {reason}")]
    ServiceControl { unit: String, reason: String },

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for VigilError
pub type Result<T> = std::result::Result<T, VigilError>;
