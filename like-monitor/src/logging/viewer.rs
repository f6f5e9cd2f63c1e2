//! Reading and clearing the current daily log file.

use std::path::{Path, PathBuf};

use super::log_file_date;
use crate::Result;
use crate::utils::fs::io_error;

/// Lines returned when the caller does not ask for a count.
pub const DEFAULT_TAIL_LINES: usize = 500;

/// The most recent daily log file in `log_dir`, if any.
pub async fn current_log_file(log_dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(log_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error("listing log directory", log_dir, e)),
    };

    let mut newest: Option<(chrono::NaiveDate, PathBuf)> = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| io_error("listing log directory", log_dir, e))?
    {
        let Some(date) = entry.file_name().to_str().and_then(log_file_date) else {
            continue;
        };
        if newest.as_ref().is_none_or(|(best, _)| date > *best) {
            newest = Some((date, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// The last `limit` lines of the current log file, without line endings.
///
/// `limit == 0` or a file shorter than `limit` returns every line.
pub async fn read_log_lines(log_dir: &Path, limit: usize) -> Result<Vec<String>> {
    let Some(path) = current_log_file(log_dir).await? else {
        return Ok(Vec::new());
    };
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| io_error("reading log file", &path, e))?;
    let text = String::from_utf8_lossy(&bytes);

    let lines: Vec<&str> = text.lines().collect();
    let skip = if limit == 0 {
        0
    } else {
        lines.len().saturating_sub(limit)
    };
    Ok(lines[skip..].iter().map(|line| line.to_string()).collect())
}

/// Truncate the current log file. Missing files are not an error.
pub async fn clear_log(log_dir: &Path) -> Result<()> {
    let Some(path) = current_log_file(log_dir).await? else {
        return Ok(());
    };
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .await
        .map_err(|e| io_error("opening log file", &path, e))?;
    file.set_len(0)
        .await
        .map_err(|e| io_error("truncating log file", &path, e))?;
    tracing::info!(path = %path.display(), "Log file cleared");
    Ok(())
}
