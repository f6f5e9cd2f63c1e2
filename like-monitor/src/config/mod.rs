//! Operator settings: storage, live service and typed views.

mod events;
mod service;
pub mod settings;
mod store;

pub use events::{ConfigEventBroadcaster, ConfigUpdateEvent};
pub use service::{ConfigEntry, ConfigService, coerce_value, is_truthy_text};
pub use settings::MonitorSettings;
pub use store::{ConfigDocument, ConfigStore, JsonFileConfigStore};
