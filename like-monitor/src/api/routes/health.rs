//! Health check routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::api::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub monitor_ready: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness_check))
}

/// Reports `degraded` while the monitor could not be built (e.g. no database settings).
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let monitor_ready = state.monitor.is_some();
    Json(HealthResponse {
        status: if monitor_ready { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
        monitor_ready,
    })
}

async fn liveness_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "uptime_secs": state.started_at.elapsed().as_secs()
        })),
    )
}
