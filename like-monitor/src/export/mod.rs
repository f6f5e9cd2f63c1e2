//! Export of deficiency records and browsing of exported files.

pub mod csv_sink;
pub mod files;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{ConfigService, settings};
use crate::monitor::DeficiencyGroups;

pub use csv_sink::{CSV_HEADERS, CsvExportSink};
pub use files::{CsvTable, ExportFileInfo, ExportFiles};

/// Where export files live.
#[derive(Clone)]
pub enum ExportDir {
    Fixed(PathBuf),
    /// Read from `EXPORT_DIR` every time, so a settings change applies to the next export.
    Configured(Arc<ConfigService>),
}

impl ExportDir {
    pub fn resolve(&self) -> PathBuf {
        match self {
            Self::Fixed(path) => path.clone(),
            Self::Configured(config) => settings::export_dir(config),
        }
    }
}

/// A product whose file could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportFailure {
    pub product_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Names of the files written, relative to the export directory.
    pub files: Vec<String>,
    pub failed: Vec<ExportFailure>,
}

/// Receives the grouped records of a pass.
///
/// A failure for one product never prevents the others from being written.
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn export(&self, groups: &DeficiencyGroups) -> ExportSummary;
}
