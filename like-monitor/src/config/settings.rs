//! Typed views over the settings the monitor reads.
//!
//! Each view is read fresh from [`ConfigService`] when needed; nothing here
//! is cached between passes.

use std::path::PathBuf;

use serde_json::Value;

use super::service::{ConfigService, is_truthy_text};
use crate::{Error, Result};

pub const EXPORT_TIME_OFFSET: &str = "EXPORT_TIME_OFFSET";
pub const EXPORT_TIME_INTERVAL: &str = "EXPORT_TIME_INTERVAL";
pub const MONITORED_GOOD_IDS: &str = "MONITORED_GOOD_IDS";
pub const IO_WORKERS_NUM: &str = "IO_WORKERS_NUM";
pub const IS_AUTO_EXPORT: &str = "IS_AUTO_EXPORT";
pub const IS_AUTO_REFUND: &str = "IS_AUTO_REFUND";
pub const EXPORT_DIR: &str = "EXPORT_DIR";

pub const OWLPROXY_KEY_ID: &str = "OWLPROXY_KEY_ID";
pub const OWLPROXY_KEY_SECRET: &str = "OWLPROXY_KEY_SECRET";
pub const OWLPROXY_COUNTRY: &str = "OWLPROXY_COUNTRY";
pub const OWLPROXY_LIFETIME: &str = "OWLPROXY_LIFETIME";

pub const DB_HOST: &str = "DB_HOST";
pub const DB_PORT: &str = "DB_PORT";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_NAME: &str = "DB_NAME";

pub const NINGMENG_USERNAME: &str = "NINGMENG_USERNAME";
pub const NINGMENG_PASSWORD: &str = "NINGMENG_PASSWORD";
pub const NINGMENG_IV: &str = "NINGMENG_IV";
pub const NINGMENG_GOODS_NAMES: &str = "NINGMENG_GOODS_NAMES";
pub const YUNMA_TOKEN: &str = "YUNMA_TOKEN";
pub const NOTIFY_WEBHOOK_URL: &str = "NOTIFY_WEBHOOK_URL";

pub const DEFAULT_IO_WORKERS: usize = 10;
pub const DEFAULT_EXPORT_DIR: &str = "exports";
pub const DEFAULT_PROXY_LIFETIME_SECS: u64 = 300;
pub const DEFAULT_DB_PORT: u16 = 3306;

/// Integer from a JSON number or numeric string.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `true`, non-zero numbers and truthy words (`1`, `true`, `yes`, `y`, `on`).
pub fn value_is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => is_truthy_text(s),
        _ => false,
    }
}

/// Product ids from a JSON array (numbers or numeric strings) or a comma separated string.
fn value_as_ids(value: &Value) -> Option<Vec<i64>> {
    match value {
        Value::Array(items) => items.iter().map(value_as_i64).collect(),
        Value::String(s) if s.trim().starts_with('[') => {
            serde_json::from_str::<Value>(s).ok().as_ref().and_then(value_as_ids)
        }
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse().ok())
            .collect(),
        Value::Number(_) => value_as_i64(value).map(|id| vec![id]),
        _ => None,
    }
}

/// Names from a JSON array of strings or a comma separated string.
fn value_as_names(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if s.trim().starts_with('[') => serde_json::from_str::<Value>(s)
            .map(|parsed| value_as_names(&parsed))
            .unwrap_or_default(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn required_i64(config: &ConfigService, key: &str) -> Result<i64> {
    let value = config
        .get(key)
        .ok_or_else(|| Error::config(format!("missing required setting {key}")))?;
    value_as_i64(&value)
        .ok_or_else(|| Error::config(format!("setting {key} must be an integer, got {value}")))
}

fn optional_i64(config: &ConfigService, key: &str) -> Option<i64> {
    config.get(key).as_ref().and_then(value_as_i64)
}

fn flag(config: &ConfigService, key: &str) -> bool {
    config.get(key).as_ref().is_some_and(value_is_truthy)
}

/// Settings that drive one monitoring pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Seconds between now and the end of the monitoring window.
    pub export_time_offset: i64,
    /// Window length in seconds; also the loop cadence.
    pub export_time_interval: i64,
    pub monitored_good_ids: Vec<i64>,
    pub io_workers: usize,
    pub auto_export: bool,
    pub auto_refund: bool,
}

impl MonitorSettings {
    pub fn from_config(config: &ConfigService) -> Result<Self> {
        let export_time_offset = required_i64(config, EXPORT_TIME_OFFSET)?;
        let export_time_interval = required_i64(config, EXPORT_TIME_INTERVAL)?;

        let ids = config
            .get(MONITORED_GOOD_IDS)
            .ok_or_else(|| Error::config(format!("missing required setting {MONITORED_GOOD_IDS}")))?;
        let monitored_good_ids = value_as_ids(&ids).ok_or_else(|| {
            Error::config(format!(
                "setting {MONITORED_GOOD_IDS} must be a list of product ids, got {ids}"
            ))
        })?;

        let io_workers = optional_i64(config, IO_WORKERS_NUM)
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_IO_WORKERS);

        Ok(Self {
            export_time_offset,
            export_time_interval,
            monitored_good_ids,
            io_workers,
            auto_export: flag(config, IS_AUTO_EXPORT),
            auto_refund: flag(config, IS_AUTO_REFUND),
        })
    }
}

/// Whether the background loop should run passes. Read on every cycle.
pub fn auto_export_enabled(config: &ConfigService) -> bool {
    flag(config, IS_AUTO_EXPORT)
}

/// The active loop cadence in seconds, if readable.
pub fn export_interval_secs(config: &ConfigService) -> Option<i64> {
    optional_i64(config, EXPORT_TIME_INTERVAL)
}

pub fn export_dir(config: &ConfigService) -> PathBuf {
    config
        .get_string(EXPORT_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR))
}

/// Credentials and shape of proxy provisioning requests.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub key_id: String,
    pub key_secret: String,
    pub country: String,
    pub lifetime_secs: u64,
}

impl std::fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxySettings")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .field("country", &self.country)
            .field("lifetime_secs", &self.lifetime_secs)
            .finish()
    }
}

impl ProxySettings {
    pub fn from_config(config: &ConfigService) -> Self {
        Self {
            key_id: config.get_string(OWLPROXY_KEY_ID).unwrap_or_default(),
            key_secret: config.get_string(OWLPROXY_KEY_SECRET).unwrap_or_default(),
            country: config.get_string(OWLPROXY_COUNTRY).unwrap_or_default(),
            lifetime_secs: optional_i64(config, OWLPROXY_LIFETIME)
                .filter(|secs| *secs > 0)
                .map(|secs| secs as u64)
                .unwrap_or(DEFAULT_PROXY_LIFETIME_SECS),
        }
    }

    pub fn to_owlproxy_config(&self) -> proxy_pool::OwlProxyConfig {
        proxy_pool::OwlProxyConfig::new(&self.key_id, &self.key_secret)
            .with_country(&self.country)
            .with_lifetime_secs(self.lifetime_secs)
    }
}

/// Connection settings of the order database.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .finish()
    }
}

impl DatabaseSettings {
    pub fn from_config(config: &ConfigService) -> Result<Self> {
        let required = |key: &str| {
            config
                .get_string(key)
                .ok_or_else(|| Error::config(format!("missing required setting {key}")))
        };
        let port = match optional_i64(config, DB_PORT) {
            None => DEFAULT_DB_PORT,
            Some(port) => u16::try_from(port)
                .map_err(|_| Error::config(format!("setting {DB_PORT} out of range: {port}")))?,
        };

        Ok(Self {
            host: required(DB_HOST)?,
            port,
            user: required(DB_USER)?,
            password: config.get_string(DB_PASSWORD).unwrap_or_default(),
            name: required(DB_NAME)?,
        })
    }
}

/// Login and scope of automatic refund submission.
#[derive(Clone, PartialEq, Eq)]
pub struct RefundSettings {
    pub username: String,
    /// Already encrypted by the operator; sent as-is with `iv`.
    pub password: String,
    pub iv: String,
    pub goods_names: Vec<String>,
    pub captcha_token: String,
}

impl std::fmt::Debug for RefundSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefundSettings")
            .field("username", &self.username)
            .field("goods_names", &self.goods_names)
            .finish_non_exhaustive()
    }
}

impl RefundSettings {
    pub fn from_config(config: &ConfigService) -> Self {
        Self {
            username: config.get_string(NINGMENG_USERNAME).unwrap_or_default(),
            password: config.get_string(NINGMENG_PASSWORD).unwrap_or_default(),
            iv: config.get_string(NINGMENG_IV).unwrap_or_default(),
            goods_names: config
                .get(NINGMENG_GOODS_NAMES)
                .map(|v| value_as_names(&v))
                .unwrap_or_default(),
            captcha_token: config.get_string(YUNMA_TOKEN).unwrap_or_default(),
        }
    }

    /// Whether refunds for `product_name` go to the partner.
    pub fn covers(&self, product_name: &str) -> bool {
        self.goods_names.iter().any(|name| name == product_name)
    }
}

pub fn notify_webhook_url(config: &ConfigService) -> Option<String> {
    config.get_string(NOTIFY_WEBHOOK_URL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::store::{ConfigDocument, ConfigStore};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct FixedStore(ConfigDocument);

    #[async_trait]
    impl ConfigStore for FixedStore {
        async fn load(&self) -> Result<ConfigDocument> {
            Ok(self.0.clone())
        }
        async fn save(&self, _: &ConfigDocument) -> Result<()> {
            Ok(())
        }
    }

    async fn service(document: Value) -> ConfigService {
        let store = FixedStore(document.as_object().unwrap().clone());
        ConfigService::load(Arc::new(store)).await.unwrap()
    }

    #[test]
    fn test_value_as_i64() {
        assert_eq!(value_as_i64(&json!(60)), Some(60));
        assert_eq!(value_as_i64(&json!(" 60 ")), Some(60));
        assert_eq!(value_as_i64(&json!(60.0)), Some(60));
        assert_eq!(value_as_i64(&json!(60.5)), None);
        assert_eq!(value_as_i64(&json!("sixty")), None);
        assert_eq!(value_as_i64(&json!(null)), None);
    }

    #[test]
    fn test_truthy_values() {
        for v in [json!(true), json!(1), json!("1"), json!("true"), json!("on")] {
            assert!(value_is_truthy(&v), "{v}");
        }
        for v in [json!(false), json!(0), json!("0"), json!(""), json!(null), json!([1])] {
            assert!(!value_is_truthy(&v), "{v}");
        }
    }

    #[test]
    fn test_ids_forms() {
        assert_eq!(value_as_ids(&json!([1, "2", 3])), Some(vec![1, 2, 3]));
        assert_eq!(value_as_ids(&json!("4, 5,")), Some(vec![4, 5]));
        assert_eq!(value_as_ids(&json!("[6,7]")), Some(vec![6, 7]));
        assert_eq!(value_as_ids(&json!(8)), Some(vec![8]));
        assert_eq!(value_as_ids(&json!([1, "x"])), None);
        assert_eq!(value_as_ids(&json!([])), Some(vec![]));
    }

    #[tokio::test]
    async fn test_monitor_settings() {
        let config = service(json!({
            "EXPORT_TIME_OFFSET": {"value": "3600"},
            "EXPORT_TIME_INTERVAL": {"value": 600},
            "MONITORED_GOOD_IDS": {"value": [101, 102]},
            "IS_AUTO_EXPORT": {"value": "1"},
        }))
        .await;

        let settings = MonitorSettings::from_config(&config).unwrap();
        assert_eq!(settings.export_time_offset, 3600);
        assert_eq!(settings.export_time_interval, 600);
        assert_eq!(settings.monitored_good_ids, vec![101, 102]);
        assert_eq!(settings.io_workers, DEFAULT_IO_WORKERS);
        assert!(settings.auto_export);
        assert!(!settings.auto_refund);
    }

    #[tokio::test]
    async fn test_required_settings_are_not_defaulted() {
        let config = service(json!({
            "EXPORT_TIME_INTERVAL": {"value": 600},
            "MONITORED_GOOD_IDS": {"value": [1]},
        }))
        .await;
        let err = MonitorSettings::from_config(&config).unwrap_err();
        assert!(matches!(err, Error::Configuration(msg) if msg.contains(EXPORT_TIME_OFFSET)));

        let config = service(json!({
            "EXPORT_TIME_OFFSET": {"value": 0},
            "EXPORT_TIME_INTERVAL": {"value": "ten minutes"},
            "MONITORED_GOOD_IDS": {"value": [1]},
        }))
        .await;
        assert!(matches!(
            MonitorSettings::from_config(&config),
            Err(Error::Configuration(_))
        ));

        let config = service(json!({
            "EXPORT_TIME_OFFSET": {"value": 0},
            "EXPORT_TIME_INTERVAL": {"value": 60},
        }))
        .await;
        assert!(matches!(
            MonitorSettings::from_config(&config),
            Err(Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_worker_count_falls_back() {
        let config = service(json!({
            "EXPORT_TIME_OFFSET": 0,
            "EXPORT_TIME_INTERVAL": 60,
            "MONITORED_GOOD_IDS": [1],
            "IO_WORKERS_NUM": 0,
        }))
        .await;
        assert_eq!(
            MonitorSettings::from_config(&config).unwrap().io_workers,
            DEFAULT_IO_WORKERS
        );
    }

    #[tokio::test]
    async fn test_proxy_and_refund_settings() {
        let config = service(json!({
            "OWLPROXY_KEY_ID": "ak",
            "OWLPROXY_KEY_SECRET": "sk",
            "OWLPROXY_COUNTRY": "US",
            "OWLPROXY_LIFETIME": {"value": 600},
            "NINGMENG_GOODS_NAMES": {"value": ["抖音点赞", "快手点赞"]},
        }))
        .await;

        let proxy = ProxySettings::from_config(&config);
        assert_eq!(proxy.to_owlproxy_config().lifetime_minutes, 10);
        assert!(!format!("{proxy:?}").contains("sk"));

        let refund = RefundSettings::from_config(&config);
        assert!(refund.covers("抖音点赞"));
        assert!(!refund.covers("其他"));
        assert_eq!(export_dir(&config), PathBuf::from(DEFAULT_EXPORT_DIR));
    }

    #[tokio::test]
    async fn test_database_settings() {
        let config = service(json!({
            "DB_HOST": "127.0.0.1",
            "DB_PORT": "3307",
            "DB_USER": "monitor",
            "DB_PASSWORD": "pw",
            "DB_NAME": "shop",
        }))
        .await;
        let db = DatabaseSettings::from_config(&config).unwrap();
        assert_eq!(db.port, 3307);
        assert!(!format!("{db:?}").contains("pw"));

        let config = service(json!({ "DB_HOST": "127.0.0.1" })).await;
        assert!(DatabaseSettings::from_config(&config).is_err());
    }
}
