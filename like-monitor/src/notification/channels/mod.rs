//! Notification channels.

mod webhook;

pub use webhook::WebhookChannel;

use async_trait::async_trait;

use super::events::NotificationEvent;
use crate::Result;

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn channel_type(&self) -> &'static str;

    /// Disabled channels are skipped by the service.
    fn is_enabled(&self) -> bool;

    async fn send(&self, event: &NotificationEvent) -> Result<()>;
}
