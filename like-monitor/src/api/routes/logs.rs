//! Log viewer.
//!
//! # Endpoints
//!
//! - `GET /api/logs?limit=N` - Last N lines of the current log file (0 for all)
//! - `DELETE /api/logs` - Truncate the current log file
//! - `GET /api/logs/filter` - Current filter directive
//! - `PUT /api/logs/filter` - Replace the filter directive

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::logging::{DEFAULT_TAIL_LINES, LoggingConfig};

#[derive(Debug, Default, Deserialize)]
pub struct TailQuery {
    pub limit: Option<i64>,
}

impl TailQuery {
    /// Absent means the default; zero or negative means everything.
    fn line_limit(&self) -> usize {
        match self.limit {
            None => DEFAULT_TAIL_LINES,
            Some(n) if n <= 0 => 0,
            Some(n) => n as usize,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TailResponse {
    pub lines: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilterBody {
    pub filter: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tail_log).delete(clear_log))
        .route("/filter", get(get_filter).put(set_filter))
}

fn logging(state: &AppState) -> ApiResult<&Arc<LoggingConfig>> {
    state
        .logging
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Logging config not available"))
}

async fn tail_log(
    State(state): State<AppState>,
    Query(query): Query<TailQuery>,
) -> ApiResult<Json<TailResponse>> {
    let lines = logging(&state)?.tail(query.line_limit()).await?;
    Ok(Json(TailResponse { lines }))
}

async fn clear_log(State(state): State<AppState>) -> ApiResult<StatusCode> {
    logging(&state)?.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_filter(State(state): State<AppState>) -> ApiResult<Json<FilterBody>> {
    Ok(Json(FilterBody {
        filter: logging(&state)?.get_filter(),
    }))
}

async fn set_filter(
    State(state): State<AppState>,
    Json(body): Json<FilterBody>,
) -> ApiResult<Json<FilterBody>> {
    let logging = logging(&state)?;
    logging.set_filter(&body.filter)?;
    Ok(Json(FilterBody {
        filter: logging.get_filter(),
    }))
}
