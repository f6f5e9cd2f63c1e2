//! Operator settings.
//!
//! # Endpoints
//!
//! - `GET /api/config` - All settings with descriptions
//! - `PATCH /api/config/{key}` - Update one setting from raw text
//! - `POST /api/config/reload` - Re-read the settings file

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::config::{ConfigEntry, ConfigService};

/// New value for a setting. Strings are coerced to the stored type; any other
/// JSON value is coerced from its JSON text.
#[derive(Debug, Deserialize)]
pub struct UpdateConfigRequest {
    pub value: Value,
}

impl UpdateConfigRequest {
    fn raw_text(&self) -> String {
        match &self.value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub keys: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_config))
        .route("/reload", post(reload_config))
        .route("/{key}", patch(update_config))
}

fn config_service(state: &AppState) -> ApiResult<&Arc<ConfigService>> {
    state
        .config
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Config service not available"))
}

async fn list_config(State(state): State<AppState>) -> ApiResult<Json<Vec<ConfigEntry>>> {
    Ok(Json(config_service(&state)?.entries()))
}

async fn update_config(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<UpdateConfigRequest>,
) -> ApiResult<Json<ConfigEntry>> {
    let entry = config_service(&state)?
        .update_value(&key, &request.raw_text())
        .await?;
    Ok(Json(entry))
}

async fn reload_config(State(state): State<AppState>) -> ApiResult<Json<ReloadResponse>> {
    let keys = config_service(&state)?.reload().await?;
    Ok(Json(ReloadResponse { keys }))
}
