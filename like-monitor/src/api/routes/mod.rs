//! API route definitions.

pub mod config;
pub mod files;
pub mod health;
pub mod logs;
pub mod orders;

use axum::Router;

use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/config", config::router())
        .nest("/api/orders", orders::router())
        .nest("/api/files", files::router())
        .nest("/api/logs", logs::router())
        .nest("/health", health::router())
        .with_state(state)
}
