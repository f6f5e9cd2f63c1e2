//! Persistence of the operator settings document.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::utils::fs::io_error;
use crate::{Error, Result};

/// Raw settings document: `{ "KEY": { "value": ..., "desc": "..." } }` or `{ "KEY": value }`.
pub type ConfigDocument = Map<String, Value>;

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self) -> Result<ConfigDocument>;
    async fn save(&self, document: &ConfigDocument) -> Result<()>;
}

/// Settings kept in a pretty-printed JSON file.
///
/// Saves go through a temp file in the same directory and are renamed into
/// place, so a crash never leaves a half-written document behind.
pub struct JsonFileConfigStore {
    path: PathBuf,
}

impl JsonFileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_document(path: &Path, text: &str) -> Result<ConfigDocument> {
    if text.trim().is_empty() {
        return Ok(ConfigDocument::new());
    }
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::config(format!(
            "settings file '{}' must contain a JSON object, found {}",
            path.display(),
            json_type_name(&other)
        ))),
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| io_error("creating settings directory", &dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| io_error("creating temp settings file", &dir, e))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.flush())
        .map_err(|e| io_error("writing temp settings file", tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| io_error("replacing settings file", path, e.error))?;
    Ok(())
}

#[async_trait]
impl ConfigStore for JsonFileConfigStore {
    async fn load(&self) -> Result<ConfigDocument> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => parse_document(&self.path, &text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Settings file not found, starting empty");
                Ok(ConfigDocument::new())
            }
            Err(e) => Err(io_error("reading settings file", &self.path, e)),
        }
    }

    async fn save(&self, document: &ConfigDocument) -> Result<()> {
        let mut contents = serde_json::to_vec_pretty(document)?;
        contents.push(b'\n');

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &contents))
            .await
            .map_err(|e| Error::Other(format!("settings writer task failed: {e}")))??;

        debug!(path = %self.path.display(), keys = document.len(), "Settings saved");
        Ok(())
    }
}
