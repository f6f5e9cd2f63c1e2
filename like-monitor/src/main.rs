use std::sync::Arc;

use anyhow::Context;
use engagement_parser::douyin::DouyinFetcher;
use engagement_parser::{create_client_builder, install_rustls_provider};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use like_monitor::api::{ApiServer, ApiServerConfig, AppState};
use like_monitor::config::settings::DatabaseSettings;
use like_monitor::config::{ConfigService, JsonFileConfigStore};
use like_monitor::database::{self, repositories::SqlxOrderRepository};
use like_monitor::export::{CsvExportSink, ExportDir, ExportFiles};
use like_monitor::monitor::{BatchVerifier, ConfiguredProvisioner, MonitorService};
use like_monitor::notification::{NotificationService, WebhookChannel};
use like_monitor::refund::{NingmengClient, YunmaSolver};
use like_monitor::scheduler::ScheduleLoop;
use like_monitor::{logging, panic_hook};

const DEFAULT_CONFIG_PATH: &str = "data/config.json";
const DEFAULT_LOG_DIR: &str = "logs";

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_dir = env_or("LOG_DIR", DEFAULT_LOG_DIR);
    let (logging_config, _log_guard) = logging::init_logging(&log_dir)?;
    panic_hook::install(&log_dir);
    install_rustls_provider();

    let cancel = CancellationToken::new();
    logging_config.start_retention_cleanup(cancel.clone());

    let config_path = env_or("CONFIG_PATH", DEFAULT_CONFIG_PATH);
    let store = Arc::new(JsonFileConfigStore::new(&config_path));
    let config = Arc::new(
        ConfigService::load(store)
            .await
            .with_context(|| format!("loading settings from {config_path}"))?,
    );
    info!(path = %config_path, keys = config.entries().len(), "Settings loaded");

    let http = create_client_builder(None)?
        .build()
        .context("building the shared HTTP client")?;

    let notifier = Arc::new(
        NotificationService::new()
            .with_channel(Arc::new(WebhookChannel::new(http.clone(), config.clone()))),
    );
    let export_dir = ExportDir::Configured(config.clone());
    let export_files = Arc::new(ExportFiles::new(export_dir.clone()));

    let monitor = match DatabaseSettings::from_config(&config) {
        Ok(db_settings) => {
            info!(settings = ?db_settings, "Order database configured");
            let pool = database::init_pool(&db_settings);

            let verifier = BatchVerifier::new(
                Arc::new(ConfiguredProvisioner::new(config.clone(), http.clone())),
                Arc::new(DouyinFetcher::new()),
            );
            let solver = Arc::new(YunmaSolver::new(http.clone(), config.clone()));
            let refunds = Arc::new(NingmengClient::new(http.clone(), config.clone(), solver));

            Some(Arc::new(
                MonitorService::new(
                    config.clone(),
                    Arc::new(SqlxOrderRepository::new(pool)),
                    verifier,
                    Arc::new(CsvExportSink::new(export_dir)),
                    notifier.clone(),
                )
                .with_refunds(refunds),
            ))
        }
        Err(e) => {
            warn!(error = %e, "Order database is not configured; monitoring stays off until restart");
            None
        }
    };

    let schedule = monitor.as_ref().map(|monitor| {
        Arc::new(ScheduleLoop::new(monitor.clone(), config.clone(), cancel.clone())).start()
    });

    let mut state = AppState::new()
        .with_config(config.clone())
        .with_files(export_files)
        .with_logging(logging_config.clone());
    if let Some(monitor) = &monitor {
        state = state.with_monitor(monitor.clone());
    }

    let server = ApiServer::new(ApiServerConfig::from_env_or_default(), state, cancel.clone());
    let mut server_task = tokio::spawn(async move { server.run().await });

    tokio::select! {
        result = &mut server_task => {
            cancel.cancel();
            result.context("API server task")??;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for shutdown signal")?;
            info!("Shutdown requested");
            cancel.cancel();
            server_task.await.context("API server task")??;
        }
    }

    if let Some(handle) = schedule {
        handle.await.context("schedule loop task")?;
    }

    info!("like-monitor stopped");
    Ok(())
}
