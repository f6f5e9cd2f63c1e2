//! Domain types shared by the store, the monitor and the API.

pub mod order;
pub mod window;

pub use order::{Order, OrderStatus};
pub use window::{MonitorWindow, format_ts};
