//! Operational Notifications
//!
//! Optional webhook side channel for Alert/Critical events, intended for live
//! dashboards. Delivery failures are logged and never fatal. A per-key
//! minimum-interval gate keeps a persistently unhealthy metric from turning
//! into a notification storm.

use crate::classify::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Webhook payload for one watchdog event
#[derive(Debug, Serialize)]
struct EventPayload<'a> {
    instance: &'a str,
    severity: &'a str,
    message: &'a str,
    timestamp: DateTime<Utc>,
}

/// Suppression state for one (instance, severity) key
#[derive(Debug)]
struct GateState {
    last_sent: DateTime<Utc>,
    suppressed_count: u32,
}

/// Webhook notification client with storm suppression
pub struct Notifier {
    client: reqwest::Client,
    webhook_url: String,
    min_interval_secs: u64,
    gate: RwLock<HashMap<String, GateState>>,
}

impl Notifier {
    /// Create a notifier if a webhook URL is configured
    ///
    /// The `VIGIL_WEBHOOK_URL` environment variable overrides the config
    /// value; with neither set, notifications are disabled.
    pub fn from_config(
        webhook_url: Option<&str>,
        min_interval_secs: u64,
    ) -> Option<Arc<Self>> {
        let url = std::env::var("VIGIL_WEBHOOK_URL")
            .ok()
            .or_else(|| webhook_url.map(str::to_string))?;

        info!("Webhook notifications enabled");
        Some(Arc::new(Self {
            client: reqwest::Client::new(),
            webhook_url: url,
            min_interval_secs,
            gate: RwLock::new(HashMap::new()),
        }))
    }

    /// Send an event notification; failures are logged, never returned
    pub async fn notify(&self, instance: &str, severity: Severity, message: &str) {
        if self.should_suppress(instance, severity).await {
            return;
        }

        let payload = EventPayload {
            instance,
            severity: severity.as_str(),
            message,
            timestamp: Utc::now(),
        };

        match self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                debug!(instance, %severity, "notification sent");
            }
            Ok(resp) => {
                error!(
                    instance,
                    %severity,
                    status = %resp.status(),
                    "notification rejected by webhook"
                );
            }
            Err(e) => {
                error!(instance, %severity, "notification delivery failed: {e}");
            }
        }
    }

    /// Check the per-key minimum-interval gate
    async fn should_suppress(&self, instance: &str, severity: Severity) -> bool {
        let key = format!("{instance}:{severity}");
        let now = Utc::now();

        let mut gate = self.gate.write().await;
        if let Some(state) = gate.get_mut(&key) {
            let elapsed = now.signed_duration_since(state.last_sent).num_seconds();
            if elapsed >= 0 && (elapsed as u64) < self.min_interval_secs {
                state.suppressed_count += 1;
                debug!(
                    key = %key,
                    suppressed = state.suppressed_count,
                    "notification suppressed"
                );
                return true;
            }
            state.last_sent = now;
            state.suppressed_count = 0;
        } else {
            gate.insert(
                key,
                GateState {
                    last_sent: now,
                    suppressed_count: 0,
                },
            );
        }

        false
    }
}
