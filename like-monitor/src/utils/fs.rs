//! IO helpers that keep the operation and path in the error.

use std::path::Path;

use crate::{Error, Result};

pub fn io_error(op: &'static str, path: &Path, source: std::io::Error) -> Error {
    Error::io_path(op, path, source)
}

/// `create_dir_all`, reporting failures as `op` on `path`.
pub async fn ensure_dir_all_with_op(op: &'static str, path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| io_error(op, path, e))
}

pub async fn ensure_dir_all(path: &Path) -> Result<()> {
    ensure_dir_all_with_op("creating directory", path).await
}

/// Blocking variant for startup code that runs before the runtime does IO.
pub fn ensure_dir_all_sync_with_op(op: &'static str, path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| io_error(op, path, e))
}
