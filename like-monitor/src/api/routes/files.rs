//! Exported CSV files.
//!
//! # Endpoints
//!
//! - `GET /api/files` - Export files, newest first
//! - `GET /api/files/{name}` - Headers and rows of one file
//! - `DELETE /api/files?start=&end=` - Delete files modified in an epoch-second range, or all

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::export::{CsvTable, ExportFileInfo, ExportFiles};

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRangeQuery {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FileContentResponse {
    pub name: String,
    #[serde(flatten)]
    pub table: CsvTable,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_files).delete(delete_files))
        .route("/{name}", get(read_file))
}

fn export_files(state: &AppState) -> ApiResult<&Arc<ExportFiles>> {
    state
        .files
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Export files not available"))
}

fn local_time(secs: i64) -> ApiResult<DateTime<Local>> {
    Local
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| ApiError::validation(format!("invalid timestamp {secs}")))
}

/// Both bounds, or neither.
fn delete_range(query: &DeleteRangeQuery) -> ApiResult<Option<(DateTime<Local>, DateTime<Local>)>> {
    match (query.start, query.end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => Ok(Some((local_time(start)?, local_time(end)?))),
        _ => Err(ApiError::validation("start and end must be given together")),
    }
}

async fn list_files(State(state): State<AppState>) -> ApiResult<Json<Vec<ExportFileInfo>>> {
    Ok(Json(export_files(&state)?.list().await?))
}

async fn read_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<FileContentResponse>> {
    let table = export_files(&state)?.read_table(&name).await?;
    Ok(Json(FileContentResponse { name, table }))
}

async fn delete_files(
    State(state): State<AppState>,
    Query(query): Query<DeleteRangeQuery>,
) -> ApiResult<Json<DeleteResponse>> {
    let files = export_files(&state)?;
    let deleted = match delete_range(&query)? {
        Some((start, end)) => files.delete_between(start, end).await?,
        None => files.delete_all().await?,
    };
    Ok(Json(DeleteResponse { deleted }))
}
