//! Cooperative Shutdown
//!
//! Operator-requested shutdown is the only path that stops a watchdog loop.
//! The signal is checked between ticks; the current tick always finishes
//! before the loop exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Shutdown signal types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Normal graceful shutdown (SIGTERM, SIGINT)
    Graceful,
    /// Urgent shutdown (SIGQUIT)
    Urgent,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Graceful => write!(f, "graceful"),
            ShutdownSignal::Urgent => write!(f, "urgent"),
        }
    }
}

/// Shutdown coordinator shared by all watchdog loops
pub struct Shutdown {
    requested: AtomicBool,
    signal_tx: broadcast::Sender<ShutdownSignal>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (signal_tx, _) = broadcast::channel(8);
        Self {
            requested: AtomicBool::new(false),
            signal_tx,
        }
    }

    /// Subscribe to the shutdown signal
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.signal_tx.subscribe()
    }

    /// Check if shutdown has been requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Request shutdown; duplicate requests are ignored
    pub fn request(&self, signal: ShutdownSignal) {
        if self.requested.swap(true, Ordering::SeqCst) {
            warn!("Shutdown already requested, ignoring duplicate signal: {signal}");
            return;
        }

        info!("Shutdown requested: {signal}");
        let _ = self.signal_tx.send(signal);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Install OS signal handlers that request shutdown
pub async fn install_signal_handlers(shutdown: Arc<Shutdown>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let on_sigterm = shutdown.clone();
        let on_sigint = shutdown.clone();
        let on_sigquit = shutdown;

        tokio::spawn(async move {
            let mut stream =
                signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");
            stream.recv().await;
            info!("Received SIGTERM");
            on_sigterm.request(ShutdownSignal::Graceful);
        });

        tokio::spawn(async move {
            let mut stream =
                signal(SignalKind::interrupt()).expect("Failed to install SIGINT handler");
            stream.recv().await;
            info!("Received SIGINT");
            on_sigint.request(ShutdownSignal::Graceful);
        });

        tokio::spawn(async move {
            let mut stream =
                signal(SignalKind::quit()).expect("Failed to install SIGQUIT handler");
            stream.recv().await;
            warn!("Received SIGQUIT - urgent shutdown");
            on_sigquit.request(ShutdownSignal::Urgent);
        });
    }

    #[cfg(windows)]
    {
        tokio::spawn(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
            info!("Received Ctrl+C");
            shutdown.request(ShutdownSignal::Graceful);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_shutdown_signal_display() {
        assert_eq!(ShutdownSignal::Graceful.to_string(), "graceful");
        assert_eq!(ShutdownSignal::Urgent.to_string(), "urgent");
    }

    #[tokio::test]
    async fn test_shutdown_request() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();

        assert!(!shutdown.is_requested());
        shutdown.request(ShutdownSignal::Graceful);
        assert!(shutdown.is_requested());
        assert_eq!(
            assert_ok!(rx.recv().await),
            ShutdownSignal::Graceful
        );

        // Duplicate request is ignored.
        shutdown.request(ShutdownSignal::Urgent);
        assert!(rx.try_recv().is_err());
    }
}
