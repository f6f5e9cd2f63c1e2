//! Eligible orders and on-demand passes.
//!
//! # Endpoints
//!
//! - `GET /api/orders` - Orders in the current monitoring window
//! - `POST /api/orders/export` - Run a pass now and return its report

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;
use crate::domain::{MonitorWindow, Order, format_ts};
use crate::monitor::{MonitorService, PassReport, PassTrigger};

/// An order with display-ready status and times.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub status_label: String,
    pub created_at_text: String,
    pub synced_at_text: String,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            status_label: order.status.to_string(),
            created_at_text: format_ts(order.created_at),
            synced_at_text: format_ts(order.synced_at),
            order,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EligibleOrdersResponse {
    pub window: MonitorWindow,
    pub window_text: String,
    pub total: usize,
    pub orders: Vec<OrderView>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/export", post(export_now))
}

fn monitor(state: &AppState) -> ApiResult<&Arc<MonitorService>> {
    state
        .monitor
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Monitor not available, check the database settings"))
}

async fn list_orders(State(state): State<AppState>) -> ApiResult<Json<EligibleOrdersResponse>> {
    let eligible = monitor(&state)?.list_eligible_orders().await?;
    Ok(Json(EligibleOrdersResponse {
        window: eligible.window,
        window_text: eligible.window.describe(),
        total: eligible.orders.len(),
        orders: eligible.orders.into_iter().map(OrderView::from).collect(),
    }))
}

/// Errors of an on-demand pass are returned to the caller and also notified.
async fn export_now(State(state): State<AppState>) -> ApiResult<Json<PassReport>> {
    let report = monitor(&state)?.run_pass(PassTrigger::OnDemand).await?;
    Ok(Json(report))
}
