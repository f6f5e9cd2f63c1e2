//! Notifications emitted when a pass finishes.
//!
//! Events fan out to every enabled channel; a failing channel is logged and
//! never fails the pass that produced the event.

pub mod channels;
pub mod events;
mod service;

pub use channels::{NotificationChannel, WebhookChannel};
pub use events::{NotificationEvent, NotificationPriority};
pub use service::NotificationService;
