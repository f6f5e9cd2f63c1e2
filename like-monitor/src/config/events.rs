//! Configuration update events.
//!
//! Broadcast when a setting changes so long-running services can react
//! without polling.

use tokio::sync::broadcast;

/// Default broadcast channel capacity.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Events broadcast when configuration changes occur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigUpdateEvent {
    /// A single key was written through the update API.
    ValueUpdated { key: String },
    /// The whole document was re-read from the store.
    Reloaded,
}

impl ConfigUpdateEvent {
    pub fn description(&self) -> String {
        match self {
            Self::ValueUpdated { key } => format!("value updated: {key}"),
            Self::Reloaded => "configuration reloaded".to_string(),
        }
    }
}

/// Fan-out of [`ConfigUpdateEvent`]s to any number of subscribers.
#[derive(Clone)]
pub struct ConfigEventBroadcaster {
    sender: broadcast::Sender<ConfigUpdateEvent>,
}

impl ConfigEventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigUpdateEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning how many receivers got it.
    pub fn publish(&self, event: ConfigUpdateEvent) -> usize {
        tracing::debug!("Publishing config event: {}", event.description());
        // No receivers is not an error.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ConfigEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
