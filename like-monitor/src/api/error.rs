//! JSON error bodies for failed requests.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    /// Stable machine-readable code, e.g. `VALIDATION_ERROR`.
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Handler error carrying its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    fn with_status(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Well-formed request with unusable values.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// An upstream service (proxy provider, refund partner, captcha solver) failed.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message)
    }

    /// A collaborator was not wired at startup, or the database is down.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = ApiErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { entity_type, id } => Self::not_found(format!("{entity_type} '{id}' not found")),
            Error::Validation(msg) => Self::validation(msg),
            Error::Configuration(msg) => Self::bad_request(msg),
            Error::Refund(msg) => Self::bad_gateway(msg),
            Error::Provisioning(_) | Error::Http(_) => Self::bad_gateway(err.to_string()),
            Error::DatabaseSqlx(e) => {
                tracing::error!(error = %e, "Order database query failed");
                Self::service_unavailable("Order database is unavailable")
            }
            other => {
                // Internal details stay in the log.
                tracing::error!(error = %other, "Request failed with an internal error");
                Self::internal("Internal error")
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
