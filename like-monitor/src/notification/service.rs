use std::sync::Arc;

use tracing::{debug, warn};

use super::channels::NotificationChannel;
use super::events::NotificationEvent;

/// Fans events out to the registered channels.
#[derive(Default)]
pub struct NotificationService {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Deliver `event` to every enabled channel, returning how many accepted it.
    pub async fn notify(&self, event: &NotificationEvent) -> usize {
        let mut delivered = 0;
        for channel in self.channels.iter().filter(|c| c.is_enabled()) {
            match channel.send(event).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    channel = channel.channel_type(),
                    event = event.event_type(),
                    error = %e,
                    "Notification delivery failed"
                ),
            }
        }
        debug!(event = event.event_type(), delivered, "Notification dispatched");
        delivered
    }
}
