//! Configuration service implementation.
//!
//! The ConfigService owns the live settings document. Every read goes
//! through it, so a value written through [`ConfigService::update_value`]
//! is what the next reader sees.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Number, Value, json};
use tokio::sync::{Mutex, broadcast};

use super::events::{ConfigEventBroadcaster, ConfigUpdateEvent};
use super::store::{ConfigDocument, ConfigStore, json_type_name};
use crate::{Error, Result};

/// One setting as shown to operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

/// Text accepted as `true` for boolean settings (after trim + lowercase).
const TRUTHY_WORDS: &[&str] = &["1", "true", "yes", "y", "on"];

pub fn is_truthy_text(raw: &str) -> bool {
    TRUTHY_WORDS.contains(&raw.trim().to_lowercase().as_str())
}

/// Coerce operator input to the type of the value currently stored.
///
/// Integers and floats must parse, booleans follow [`is_truthy_text`], arrays
/// and objects must be valid JSON. Strings, nulls and unknown keys keep the
/// raw text.
pub fn coerce_value(current: Option<&Value>, raw: &str) -> Result<Value> {
    match current {
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| Error::validation(format!("'{raw}' is not an integer"))),
        Some(Value::Number(_)) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| Error::validation(format!("'{raw}' is not a number"))),
        Some(Value::Bool(_)) => Ok(Value::Bool(is_truthy_text(raw))),
        Some(current @ (Value::Array(_) | Value::Object(_))) => serde_json::from_str(raw)
            .map_err(|e| {
                Error::validation(format!(
                    "'{raw}' is not valid JSON for a {} setting: {e}",
                    json_type_name(current)
                ))
            }),
        _ => Ok(Value::String(raw.to_string())),
    }
}

/// `{ "value": v, ... }` entries are wrapped; anything else is a bare value.
fn unwrap_entry(entry: &Value) -> (&Value, Option<&str>) {
    match entry {
        Value::Object(map) if map.contains_key("value") => (
            &map["value"],
            map.get("desc").and_then(Value::as_str),
        ),
        bare => (bare, None),
    }
}

pub struct ConfigService {
    store: Arc<dyn ConfigStore>,
    document: RwLock<ConfigDocument>,
    /// Held across build, save and swap so saves land in call order.
    write_lock: Mutex<()>,
    broadcaster: ConfigEventBroadcaster,
}

impl ConfigService {
    /// Load the document from `store` and wrap it in a service.
    pub async fn load(store: Arc<dyn ConfigStore>) -> Result<Self> {
        let document = store.load().await?;
        tracing::info!(keys = document.len(), "Configuration loaded");
        Ok(Self {
            store,
            document: RwLock::new(document),
            write_lock: Mutex::new(()),
            broadcaster: ConfigEventBroadcaster::new(),
        })
    }

    // ========== Event Broadcasting ==========

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigUpdateEvent> {
        self.broadcaster.subscribe()
    }

    // ========== Reads ==========

    /// Current value of `key`, unwrapped from its `{value, desc}` entry.
    pub fn get(&self, key: &str) -> Option<Value> {
        let document = self.document.read();
        document.get(key).map(|entry| unwrap_entry(entry).0.clone())
    }

    /// String form of a setting. Numbers and booleans are rendered; empty strings count as unset.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// All entries in key order.
    pub fn entries(&self) -> Vec<ConfigEntry> {
        let document = self.document.read();
        document
            .iter()
            .map(|(key, entry)| {
                let (value, desc) = unwrap_entry(entry);
                ConfigEntry {
                    key: key.clone(),
                    value: value.clone(),
                    desc: desc.map(str::to_string),
                }
            })
            .collect()
    }

    // ========== Writes ==========

    /// Coerce `raw` to the stored type of `key`, persist the document and then make it live.
    ///
    /// The `desc` of a wrapped entry is kept; a bare or new key becomes `{ "value": v }`.
    /// When the save fails the live document is left untouched.
    pub async fn update_value(&self, key: &str, raw: &str) -> Result<ConfigEntry> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::validation("setting key must not be empty"));
        }

        let _writer = self.write_lock.lock().await;

        let mut snapshot = self.document.read().clone();
        let current = snapshot.get(key).map(|entry| unwrap_entry(entry).0);
        let value = coerce_value(current, raw)?;
        match snapshot.get_mut(key) {
            Some(Value::Object(map)) if map.contains_key("value") => {
                map.insert("value".to_string(), value);
            }
            _ => {
                snapshot.insert(key.to_string(), json!({ "value": value }));
            }
        }

        self.store.save(&snapshot).await?;

        let (value, desc) = unwrap_entry(&snapshot[key]);
        let entry = ConfigEntry {
            key: key.to_string(),
            value: value.clone(),
            desc: desc.map(str::to_string),
        };

        *self.document.write() = snapshot;

        tracing::info!(key = %key, "Setting updated");
        self.broadcaster.publish(ConfigUpdateEvent::ValueUpdated {
            key: key.to_string(),
        });
        Ok(entry)
    }

    /// Replace the in-memory document with the stored one.
    pub async fn reload(&self) -> Result<usize> {
        let _writer = self.write_lock.lock().await;
        let document = self.store.load().await?;
        let keys = document.len();
        *self.document.write() = document;

        tracing::info!(keys, "Configuration reloaded");
        self.broadcaster.publish(ConfigUpdateEvent::Reloaded);
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        document: Mutex<ConfigDocument>,
        saves: Mutex<usize>,
        fail_saves: Mutex<bool>,
    }

    #[async_trait]
    impl ConfigStore for MemoryStore {
        async fn load(&self) -> Result<ConfigDocument> {
            Ok(self.document.lock().clone())
        }

        async fn save(&self, document: &ConfigDocument) -> Result<()> {
            tokio::task::yield_now().await;
            if *self.fail_saves.lock() {
                return Err(Error::Other("disk full".to_string()));
            }
            *self.document.lock() = document.clone();
            *self.saves.lock() += 1;
            Ok(())
        }
    }

    fn store_with(value: Value) -> Arc<MemoryStore> {
        let store = MemoryStore::default();
        *store.document.lock() = value.as_object().unwrap().clone();
        Arc::new(store)
    }

    #[test]
    fn test_coerce_integer() {
        assert_eq!(coerce_value(Some(&json!(5)), " 42 ").unwrap(), json!(42));
        assert!(matches!(
            coerce_value(Some(&json!(5)), "4.5"),
            Err(Error::Validation(_))
        ));
        assert!(coerce_value(Some(&json!(5)), "abc").is_err());
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(coerce_value(Some(&json!(0.5)), "2.25").unwrap(), json!(2.25));
        assert_eq!(coerce_value(Some(&json!(0.5)), "3").unwrap(), json!(3.0));
        assert!(coerce_value(Some(&json!(0.5)), "fast").is_err());
    }

    #[test]
    fn test_coerce_bool() {
        for raw in ["1", "true", " YES ", "y", "On"] {
            assert_eq!(coerce_value(Some(&json!(false)), raw).unwrap(), json!(true));
        }
        for raw in ["0", "false", "no", "", "enabled"] {
            assert_eq!(coerce_value(Some(&json!(true)), raw).unwrap(), json!(false));
        }
    }

    #[test]
    fn test_coerce_collections() {
        assert_eq!(
            coerce_value(Some(&json!([1])), "[1, 2, 3]").unwrap(),
            json!([1, 2, 3])
        );
        assert_eq!(
            coerce_value(Some(&json!({})), r#"{"a": 1}"#).unwrap(),
            json!({"a": 1})
        );
        assert!(matches!(
            coerce_value(Some(&json!([])), "1,2,3"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_coerce_string_null_and_missing_keep_raw() {
        assert_eq!(coerce_value(Some(&json!("1")), "0").unwrap(), json!("0"));
        assert_eq!(coerce_value(Some(&Value::Null), "12").unwrap(), json!("12"));
        assert_eq!(coerce_value(None, "[1]").unwrap(), json!("[1]"));
    }

    #[tokio::test]
    async fn test_get_unwraps_entries_and_bare_values() {
        let store = store_with(json!({
            "EXPORT_TIME_OFFSET": {"value": 3600, "desc": "偏移"},
            "IS_AUTO_EXPORT": "1",
        }));
        let service = ConfigService::load(store).await.unwrap();

        assert_eq!(service.get("EXPORT_TIME_OFFSET"), Some(json!(3600)));
        assert_eq!(service.get("IS_AUTO_EXPORT"), Some(json!("1")));
        assert_eq!(service.get("MISSING"), None);

        let entries = service.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].desc.as_deref(), Some("偏移"));
        assert_eq!(entries[1].desc, None);
    }

    #[tokio::test]
    async fn test_update_keeps_desc_and_persists() {
        let store = store_with(json!({
            "IO_WORKERS_NUM": {"value": 10, "desc": "并发数"},
        }));
        let service = ConfigService::load(store.clone()).await.unwrap();
        let mut events = service.subscribe();

        let entry = service.update_value("IO_WORKERS_NUM", "20").await.unwrap();
        assert_eq!(entry.value, json!(20));
        assert_eq!(entry.desc.as_deref(), Some("并发数"));
        assert_eq!(service.get("IO_WORKERS_NUM"), Some(json!(20)));
        assert_eq!(
            store.document.lock()["IO_WORKERS_NUM"],
            json!({"value": 20, "desc": "并发数"})
        );
        assert_eq!(
            events.recv().await.unwrap(),
            ConfigUpdateEvent::ValueUpdated {
                key: "IO_WORKERS_NUM".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_update_wraps_bare_and_new_keys() {
        let store = store_with(json!({ "IS_AUTO_EXPORT": "0" }));
        let service = ConfigService::load(store.clone()).await.unwrap();

        service.update_value("IS_AUTO_EXPORT", "1").await.unwrap();
        service.update_value("NEW_KEY", "hello").await.unwrap();

        let document = store.document.lock();
        assert_eq!(document["IS_AUTO_EXPORT"], json!({"value": "1"}));
        assert_eq!(document["NEW_KEY"], json!({"value": "hello"}));
    }

    #[tokio::test]
    async fn test_failed_coercion_changes_nothing() {
        let store = store_with(json!({ "EXPORT_TIME_INTERVAL": {"value": 600} }));
        let service = ConfigService::load(store.clone()).await.unwrap();

        assert!(service.update_value("EXPORT_TIME_INTERVAL", "ten").await.is_err());
        assert_eq!(service.get("EXPORT_TIME_INTERVAL"), Some(json!(600)));
        assert_eq!(*store.saves.lock(), 0);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_old_value_live() {
        let store = store_with(json!({ "IS_AUTO_EXPORT": {"value": false} }));
        let service = ConfigService::load(store.clone()).await.unwrap();
        let mut events = service.subscribe();
        *store.fail_saves.lock() = true;

        assert!(service.update_value("IS_AUTO_EXPORT", "true").await.is_err());
        assert_eq!(service.get("IS_AUTO_EXPORT"), Some(json!(false)));
        assert_eq!(store.document.lock()["IS_AUTO_EXPORT"], json!({"value": false}));
        assert!(events.try_recv().is_err());

        *store.fail_saves.lock() = false;
        service.update_value("IS_AUTO_EXPORT", "true").await.unwrap();
        assert_eq!(service.get("IS_AUTO_EXPORT"), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_concurrent_updates_all_reach_the_store() {
        let store = store_with(json!({ "IO_WORKERS_NUM": 10, "EXPORT_TIME_INTERVAL": 600 }));
        let service = ConfigService::load(store.clone()).await.unwrap();

        let (a, b) = tokio::join!(
            service.update_value("IO_WORKERS_NUM", "4"),
            service.update_value("EXPORT_TIME_INTERVAL", "300"),
        );
        a.unwrap();
        b.unwrap();

        let document = store.document.lock();
        assert_eq!(document["IO_WORKERS_NUM"], json!({"value": 4}));
        assert_eq!(document["EXPORT_TIME_INTERVAL"], json!({"value": 300}));
        assert_eq!(*store.saves.lock(), 2);
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_edits() {
        let store = store_with(json!({ "EXPORT_DIR": "exports" }));
        let service = ConfigService::load(store.clone()).await.unwrap();

        store
            .document
            .lock()
            .insert("EXPORT_DIR".to_string(), json!("/data/exports"));
        assert_eq!(service.get("EXPORT_DIR"), Some(json!("exports")));

        assert_eq!(service.reload().await.unwrap(), 1);
        assert_eq!(service.get_string("EXPORT_DIR").as_deref(), Some("/data/exports"));
    }
}
