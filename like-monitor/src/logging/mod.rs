//! Console and daily-file logging.
//!
//! The `EnvFilter` sits behind a reload layer so the API can change it at
//! runtime. Files older than a week are removed by a background task.

mod viewer;

use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
};

use crate::utils::fs;

pub use viewer::{DEFAULT_TAIL_LINES, clear_log, current_log_file, read_log_lines};

/// Used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str =
    "like_monitor=info,proxy_pool=info,engagement_parser=info,sqlx=warn";

/// Daily files are named `like-monitor.log.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "like-monitor.log";

const LOG_RETENTION_DAYS: i64 = 7;
const RETENTION_CHECK_EVERY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

pub type FilterHandle = Handle<EnvFilter, tracing_subscriber::Registry>;

pub struct LoggingConfig {
    handle: FilterHandle,
    log_dir: PathBuf,
}

impl LoggingConfig {
    fn new(handle: FilterHandle, log_dir: PathBuf) -> Self {
        Self { handle, log_dir }
    }

    pub fn get_filter(&self) -> String {
        self.handle
            .with_current(|filter| filter.to_string())
            .unwrap_or_default()
    }

    /// Replace the filter, e.g. with `like_monitor=debug,sqlx=warn`.
    pub fn set_filter(&self, directive: &str) -> crate::Result<()> {
        let filter = EnvFilter::try_new(directive)
            .map_err(|e| crate::Error::validation(format!("invalid filter '{directive}': {e}")))?;
        self.handle
            .reload(filter)
            .map_err(|e| crate::Error::Other(format!("filter reload failed: {e}")))?;
        info!(%directive, "Log filter changed");
        Ok(())
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Last `limit` lines of the current log file; `0` returns everything.
    pub async fn tail(&self, limit: usize) -> crate::Result<Vec<String>> {
        read_log_lines(&self.log_dir, limit).await
    }

    /// Truncate the current log file.
    pub async fn clear(&self) -> crate::Result<()> {
        clear_log(&self.log_dir).await
    }

    /// Prune old daily files now and then once a day until `cancel` fires.
    pub fn start_retention_cleanup(self: &Arc<Self>, cancel: CancellationToken) {
        let log_dir = self.log_dir.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(RETENTION_CHECK_EVERY);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => {
                        if let Err(e) = cleanup_old_logs(&log_dir, LOG_RETENTION_DAYS).await {
                            warn!(dir = %log_dir.display(), error = %e, "Log retention cleanup failed");
                        }
                    }
                }
            }
            debug!("Log retention task stopped");
        });
    }
}

/// Date suffix of a daily log file name.
pub(crate) fn log_file_date(filename: &str) -> Option<NaiveDate> {
    let suffix = filename.strip_prefix(LOG_FILE_PREFIX)?.strip_prefix('.')?;
    NaiveDate::parse_from_str(suffix, "%Y-%m-%d").ok()
}

/// Remove daily files dated more than `retention_days` before today.
async fn cleanup_old_logs(log_dir: &Path, retention_days: i64) -> std::io::Result<usize> {
    let cutoff = Local::now().date_naive() - chrono::Duration::days(retention_days);
    let mut entries = tokio::fs::read_dir(log_dir).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let expired = entry
            .file_name()
            .to_str()
            .and_then(log_file_date)
            .is_some_and(|date| date < cutoff);
        if !expired || !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "Cannot delete expired log file"),
        }
    }

    if removed > 0 {
        info!(dir = %log_dir.display(), count = removed, "Removed expired log files");
    }
    Ok(removed)
}

/// Install the global subscriber. Dropping the guard loses buffered file output.
pub fn init_logging(log_dir: &str) -> crate::Result<(Arc<LoggingConfig>, WorkerGuard)> {
    let log_path = PathBuf::from(log_dir);
    fs::ensure_dir_all_sync_with_op("creating log directory", &log_path)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_path, LOG_FILE_PREFIX));
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let (filter_layer, filter_handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_timer(LocalTimer),
        )
        .try_init()
        .map_err(|e| crate::Error::Other(format!("logging already initialized: {e}")))?;

    Ok((Arc::new(LoggingConfig::new(filter_handle, log_path)), guard))
}
