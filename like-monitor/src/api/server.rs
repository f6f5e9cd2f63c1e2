//! HTTP server wiring: listener, middleware and shared handler state.

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

use crate::api::routes;
use crate::config::ConfigService;
use crate::error::{Error, Result};
use crate::export::ExportFiles;
use crate::logging::LoggingConfig;
use crate::monitor::MonitorService;

const DEFAULT_PORT: u16 = 9991;
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub enable_cors: bool,
    /// Request body limit in bytes.
    pub body_limit: usize,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            enable_cors: true,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ApiServerConfig {
    /// Defaults overridden by `API_BIND_ADDRESS` and `API_PORT`; unparsable values are ignored.
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let bind_address = std::env::var("API_BIND_ADDRESS")
            .ok()
            .filter(|addr| !addr.trim().is_empty())
            .unwrap_or(defaults.bind_address);
        let port = std::env::var("API_PORT")
            .ok()
            .and_then(|port| port.trim().parse().ok())
            .unwrap_or(defaults.port);
        Self {
            bind_address,
            port,
            ..defaults
        }
    }

    fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| Error::config(format!("bad API listen address '{}:{}': {e}", self.bind_address, self.port)))
    }
}

/// Collaborators reachable from handlers. A missing one turns its routes into 503s.
#[derive(Clone)]
pub struct AppState {
    pub started_at: Instant,
    pub config: Option<Arc<ConfigService>>,
    pub monitor: Option<Arc<MonitorService>>,
    pub files: Option<Arc<ExportFiles>>,
    pub logging: Option<Arc<LoggingConfig>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            config: None,
            monitor: None,
            files: None,
            logging: None,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(self, config: Arc<ConfigService>) -> Self {
        Self {
            config: Some(config),
            ..self
        }
    }

    pub fn with_monitor(self, monitor: Arc<MonitorService>) -> Self {
        Self {
            monitor: Some(monitor),
            ..self
        }
    }

    pub fn with_files(self, files: Arc<ExportFiles>) -> Self {
        Self {
            files: Some(files),
            ..self
        }
    }

    pub fn with_logging(self, logging: Arc<LoggingConfig>) -> Self {
        Self {
            logging: Some(logging),
            ..self
        }
    }
}

/// Health probes are polled often and get no request span.
fn request_span(req: &Request) -> Span {
    if req.uri().path().starts_with("/health") {
        Span::none()
    } else {
        tracing::info_span!("http", method = %req.method(), path = %req.uri().path())
    }
}

pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    /// The server stops once `cancel_token` is cancelled.
    pub fn new(config: ApiServerConfig, state: AppState, cancel_token: CancellationToken) -> Self {
        Self {
            config,
            state,
            cancel_token,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn build_router(&self) -> Router {
        let mut router = routes::create_router(self.state.clone())
            .layer(DefaultBodyLimit::max(self.config.body_limit));

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router.layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_request(())
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if !span.is_disabled() {
                            tracing::info!(
                                parent: span,
                                status = res.status().as_u16(),
                                latency_ms = latency.as_millis() as u64,
                                "Request finished"
                            );
                        }
                    },
                )
                .on_failure(
                    |class: ServerErrorsFailureClass, latency: Duration, span: &Span| {
                        if !span.is_disabled() {
                            tracing::error!(
                                parent: span,
                                failure = %class,
                                latency_ms = latency.as_millis() as u64,
                                "Request failed"
                            );
                        }
                    },
                ),
        )
    }

    /// Serve until the cancellation token fires.
    pub async fn run(&self) -> Result<()> {
        let addr = self.config.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "API server listening");

        let cancel = self.cancel_token.clone();
        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("API server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ApiServerConfig::default();
        assert_eq!(config.socket_addr().unwrap().port(), 9991);
        assert!(config.enable_cors);

        let bad = ApiServerConfig {
            bind_address: "not an address".to_string(),
            ..Default::default()
        };
        assert!(matches!(bad.socket_addr(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new();
        assert!(state.started_at.elapsed().as_secs() < 1);
        assert!(state.monitor.is_none());
    }

    #[test]
    fn test_server_shares_cancel_token() {
        let token = CancellationToken::new();
        let server = ApiServer::new(ApiServerConfig::default(), AppState::new(), token.clone());
        token.cancel();
        assert!(server.cancel_token().is_cancelled());
    }
}
