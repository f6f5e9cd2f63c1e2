//! Browsing and cleanup of exported CSV files.
//!
//! File names from callers are confined to the export directory: anything
//! with a path separator or `..` is rejected.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{info, warn};

use super::ExportDir;
use crate::utils::fs::{ensure_dir_all, io_error};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFileInfo {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Local>,
}

/// A parsed export file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub struct ExportFiles {
    dir: ExportDir,
}

fn is_csv(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".csv")
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || Path::new(name).is_absolute()
    {
        return Err(Error::validation(format!("illegal file name '{name}'")));
    }
    Ok(())
}

impl ExportFiles {
    pub fn new(dir: ExportDir) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> PathBuf {
        self.dir.resolve()
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir().join(name))
    }

    /// CSV files in the export directory, newest first.
    pub async fn list(&self) -> Result<Vec<ExportFileInfo>> {
        let dir = self.dir();
        ensure_dir_all(&dir).await?;

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_error("listing export directory", &dir, e))?;
        let mut files = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("listing export directory", &dir, e))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_csv(&name) {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    warn!(file = %name, error = %e, "Cannot stat export file");
                    continue;
                }
            };
            let modified = metadata
                .modified()
                .map(DateTime::<Local>::from)
                .map_err(|e| io_error("reading modification time", &entry.path(), e))?;

            files.push(ExportFileInfo {
                name,
                size: metadata.len(),
                modified,
            });
        }

        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
        Ok(files)
    }

    async fn read_bytes(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found("export file", name))
            }
            Err(e) => Err(io_error("reading export file", &path, e)),
        }
    }

    /// Raw text of an export file; invalid UTF-8 is replaced.
    pub async fn read_content(&self, name: &str) -> Result<String> {
        let bytes = self.read_bytes(name).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Headers and rows of a CSV export, BOM stripped.
    pub async fn read_table(&self, name: &str) -> Result<CsvTable> {
        if !is_csv(name) {
            return Err(Error::validation("only CSV files can be read as a table"));
        }
        let bytes = self.read_bytes(name).await?;
        let body = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(&bytes[..]);

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(body);
        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, csv::Error>>()?;

        Ok(CsvTable { headers, rows })
    }

    /// Delete files modified within `[start, end]`, returning how many were removed.
    pub async fn delete_between(&self, start: DateTime<Local>, end: DateTime<Local>) -> Result<usize> {
        if start > end {
            return Err(Error::validation("range start is after range end"));
        }
        let targets: Vec<String> = self
            .list()
            .await?
            .into_iter()
            .filter(|f| start <= f.modified && f.modified <= end)
            .map(|f| f.name)
            .collect();
        self.remove_all(targets).await
    }

    /// Delete every export file, returning how many were removed.
    pub async fn delete_all(&self) -> Result<usize> {
        let targets = self.list().await?.into_iter().map(|f| f.name).collect();
        self.remove_all(targets).await
    }

    async fn remove_all(&self, names: Vec<String>) -> Result<usize> {
        let dir = self.dir();
        let mut removed = 0;
        for name in names {
            let path = dir.join(&name);
            tokio::fs::remove_file(&path)
                .await
                .map_err(|e| io_error("deleting export file", &path, e))?;
            removed += 1;
        }
        if removed > 0 {
            info!(dir = %dir.display(), count = removed, "Deleted export files");
        }
        Ok(removed)
    }
}
