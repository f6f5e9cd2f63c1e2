//! Generic webhook channel (HTTP POST of a JSON payload).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::NotificationChannel;
use crate::config::{ConfigService, settings};
use crate::notification::events::NotificationEvent;
use crate::{Error, Result};

/// Posts events to `NOTIFY_WEBHOOK_URL`; disabled while the key is empty.
pub struct WebhookChannel {
    client: Client,
    config: Arc<ConfigService>,
}

impl WebhookChannel {
    pub fn new(client: Client, config: Arc<ConfigService>) -> Self {
        Self { client, config }
    }

    fn build_payload(event: &NotificationEvent) -> serde_json::Value {
        json!({
            "event_type": event.event_type(),
            "priority": event.priority().to_string(),
            "title": event.title(),
            "description": event.description(),
            "timestamp": event.timestamp().to_rfc3339(),
            "data": event,
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn channel_type(&self) -> &'static str {
        "webhook"
    }

    fn is_enabled(&self) -> bool {
        settings::notify_webhook_url(&self.config).is_some()
    }

    async fn send(&self, event: &NotificationEvent) -> Result<()> {
        let Some(url) = settings::notify_webhook_url(&self.config) else {
            return Ok(());
        };

        let response = self
            .client
            .post(&url)
            .json(&Self::build_payload(event))
            .send()
            .await
            .map_err(|e| Error::Other(format!("Webhook request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Webhook rejected notification");
            return Err(Error::Other(format!("Webhook failed: {status} - {body}")));
        }

        debug!(event = event.event_type(), "Webhook notification sent");
        Ok(())
    }
}
