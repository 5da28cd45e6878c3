//! Service Control
//!
//! Issues restart commands to the host's service manager. Success is
//! reported from the command's exit status, never assumed.

use crate::error::{Result, VigilError};
use async_trait::async_trait;
use tracing::info;

/// Restart a named dependent service
#[async_trait]
pub trait ServiceControl: Send + Sync {
    async fn restart(&self, unit: &str) -> Result<()>;
}

/// systemctl-backed service control
pub struct SystemctlControl;

#[async_trait]
impl ServiceControl for SystemctlControl {
    async fn restart(&self, unit: &str) -> Result<()> {
        info!(unit, "dispatching service restart");

        let output = tokio::process::Command::new("systemctl")
            .arg("restart")
            .arg(unit)
            .output()
            .await
            .map_err(|e| VigilError::ServiceControl {
                unit: unit.to_string(),
                reason: format!("failed to run systemctl: {e}"),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(VigilError::ServiceControl {
                unit: unit.to_string(),
                reason: format!(
                    "systemctl restart exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            })
        }
    }
}
