//! REST API for the operator dashboard: settings, eligible orders, on-demand
//! passes, exported files and the log tail.

pub mod error;
pub mod routes;
pub mod server;

pub use server::{ApiServer, ApiServerConfig, AppState};
