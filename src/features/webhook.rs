//! Webhook notifications.
//!
//! Dispatches defense transition alerts to an ntfy-style endpoint.

use crate::config::{Config, GuardError, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error};

/// Defense events worth telling a human about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    DefenseModeActivated,
    DefenseModeDeactivated,
    ActuationFailed,
    ShutdownReconciled,
    ShutdownReconcileFailed,
}

impl EventType {
    const fn presentation(self) -> (&'static str, &'static str) {
        match self {
            Self::DefenseModeActivated => ("shield,red_circle", "Under Attack Mode Enabled"),
            Self::DefenseModeDeactivated => ("shield,green_circle", "Under Attack Mode Disabled"),
            Self::ActuationFailed => ("warning,electric_plug", "Cloudflare Update Failed"),
            Self::ShutdownReconciled => ("wave,green_circle", "Monitor Stopped, Defense Lifted"),
            Self::ShutdownReconcileFailed => {
                ("skull,red_circle", "Monitor Stopped, Defense Still Active")
            }
        }
    }
}

/// Webhook payload for defense events.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub event_type: EventType,
    pub timestamp: i64,
    pub cpu_load: Option<f64>,
    pub severity: u8,
    pub message: String,
}

impl WebhookPayload {
    /// Builds a payload stamped with the current time.
    #[must_use]
    pub fn now(event_type: EventType, cpu_load: Option<f64>, severity: u8, message: String) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));
        Self {
            event_type,
            timestamp,
            cpu_load,
            severity,
            message,
        }
    }
}

#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    webhook_url: Option<String>,
    webhook_token: Option<String>,
}

impl WebhookNotifier {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            webhook_url: config.webhook_url.clone(),
            webhook_token: config.webhook_token.clone(),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Fire-and-forget dispatch on the current tokio runtime.
    pub fn notify(&self, payload: WebhookPayload) {
        let Some(url) = self.webhook_url.clone() else {
            return;
        };

        let client = self.client.clone();
        let token = self.webhook_token.clone();
        tokio::spawn(async move {
            if let Err(e) = Self::send_notification(&client, &url, token.as_deref(), &payload).await
            {
                error!(error = %e, "Webhook notification failed");
            }
        });
    }

    /// Sends the payload and waits for delivery.
    ///
    /// Used on shutdown, where a spawned task could be dropped with the runtime.
    pub async fn deliver(&self, payload: WebhookPayload) {
        let Some(url) = self.webhook_url.as_deref() else {
            return;
        };
        if let Err(e) =
            Self::send_notification(&self.client, url, self.webhook_token.as_deref(), &payload)
                .await
        {
            error!(error = %e, "Webhook notification failed");
        }
    }

    async fn send_notification(
        client: &Client,
        url: &str,
        token: Option<&str>,
        payload: &WebhookPayload,
    ) -> Result<()> {
        let (tags, title) = payload.event_type.presentation();

        let mut req = client
            .post(url)
            .header("Title", title)
            .header("Priority", payload.severity.to_string())
            .header("Tags", tags)
            .body(payload.message.clone());

        if let Some(t) = token {
            req = req.header("Authorization", format!("Bearer {t}"));
        }

        req.send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| GuardError::Webhook(e.to_string()))?;

        debug!(event_type = ?payload.event_type, "Webhook notification sent");
        Ok(())
    }
}
