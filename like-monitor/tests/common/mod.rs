//! In-memory collaborators for driving the pipeline without network or database.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use engagement_parser::{EngagementFetcher, EngagementResult};
use parking_lot::Mutex;
use proxy_pool::{ProvisioningError, ProxyCredential, ProxyProvisioner, ProxyScheme};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use like_monitor::Result;
use like_monitor::config::{ConfigDocument, ConfigService, ConfigStore};
use like_monitor::database::repositories::OrderRepository;
use like_monitor::domain::{MonitorWindow, Order, OrderStatus};
use like_monitor::notification::{NotificationChannel, NotificationEvent};

pub fn credential(n: usize) -> ProxyCredential {
    ProxyCredential::new(ProxyScheme::Http, format!("10.0.0.{n}"), 8000, "user", "secret")
}

pub fn order(id: i64, product: &str, link: &str, quantity: i64, start_count: i64) -> Order {
    Order {
        id,
        order_sn: format!("SN{id}"),
        third_party_sn: Some(format!("TP{id}")),
        product_id: 42,
        product_name: product.to_string(),
        link: link.to_string(),
        quantity,
        start_count,
        recorded_count: 0,
        amount: Decimal::new(1250, 2),
        status: OrderStatus::Completed,
        created_at: 1_700_000_000,
        synced_at: 1_700_000_100,
    }
}

pub enum Provision {
    Credentials(usize),
    Fail,
}

pub struct FakeProvisioner {
    mode: Provision,
    pub requested: Mutex<Vec<usize>>,
}

impl FakeProvisioner {
    pub fn new(mode: Provision) -> Arc<Self> {
        Arc::new(Self {
            mode,
            requested: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ProxyProvisioner for FakeProvisioner {
    async fn acquire(&self, count: usize) -> std::result::Result<Vec<ProxyCredential>, ProvisioningError> {
        self.requested.lock().push(count);
        match self.mode {
            Provision::Credentials(n) => Ok((0..n).map(credential).collect()),
            Provision::Fail => Err(ProvisioningError::Rejected {
                code: 500,
                msg: "quota exhausted".to_string(),
            }),
        }
    }
}

/// Answers from a fixed table of link → like count.
///
/// Links missing from the table fail. Hosts in `broken_proxies` fail every
/// request routed through them. `delays` holds per-link latency.
#[derive(Default)]
pub struct FakeFetcher {
    pub counts: HashMap<String, u64>,
    pub delays: HashMap<String, Duration>,
    pub broken_proxies: Vec<String>,
    pub calls: AtomicUsize,
    pub attempts: Mutex<Vec<(String, Option<String>)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn with_counts(counts: &[(&str, u64)]) -> Self {
        Self {
            counts: counts
                .iter()
                .map(|(link, count)| (link.to_string(), *count))
                .collect(),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most lookups that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn lookup(&self, link: &str, host: Option<String>) -> EngagementResult {
        if let Some(delay) = self.delays.get(link) {
            tokio::time::sleep(*delay).await;
        }
        if host.is_some_and(|h| self.broken_proxies.contains(&h)) {
            return EngagementResult::failed("connection reset");
        }
        match self.counts.get(link) {
            Some(count) => EngagementResult {
                success: true,
                count: *count,
                error: None,
                page: None,
            },
            None => EngagementResult::failed("video unavailable"),
        }
    }
}

#[async_trait]
impl EngagementFetcher for FakeFetcher {
    async fn fetch(&self, link: &str, proxy: Option<&ProxyCredential>) -> EngagementResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let host = proxy.map(|p| p.host.clone());
        self.attempts.lock().push((link.to_string(), host.clone()));

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let result = self.lookup(link, host).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub struct FakeOrders {
    pub orders: Vec<Order>,
    pub queries: Mutex<Vec<(Vec<i64>, MonitorWindow)>>,
}

impl FakeOrders {
    pub fn new(orders: Vec<Order>) -> Arc<Self> {
        Arc::new(Self {
            orders,
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl OrderRepository for FakeOrders {
    async fn find_eligible(&self, product_ids: &[i64], window: &MonitorWindow) -> Result<Vec<Order>> {
        self.queries.lock().push((product_ids.to_vec(), *window));
        Ok(self.orders.clone())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub document: Mutex<ConfigDocument>,
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn load(&self) -> Result<ConfigDocument> {
        Ok(self.document.lock().clone())
    }

    async fn save(&self, document: &ConfigDocument) -> Result<()> {
        *self.document.lock() = document.clone();
        Ok(())
    }
}

/// A config service over the given `{key: value}` pairs, stored in the
/// `{"value": .., "desc": ..}` file shape.
pub async fn config_with(pairs: &[(&str, Value)]) -> Arc<ConfigService> {
    let mut document = ConfigDocument::new();
    for (key, value) in pairs {
        document.insert(key.to_string(), json!({ "value": value, "desc": "" }));
    }
    let store = Arc::new(MemoryStore {
        document: Mutex::new(document),
    });
    Arc::new(ConfigService::load(store).await.unwrap())
}

pub async fn monitor_config(extra: &[(&str, Value)]) -> Arc<ConfigService> {
    let mut pairs = vec![
        ("EXPORT_TIME_OFFSET", json!(600)),
        ("EXPORT_TIME_INTERVAL", json!(300)),
        ("MONITORED_GOOD_IDS", json!([42])),
        ("IO_WORKERS_NUM", json!(4)),
    ];
    pairs.extend(extra.iter().cloned());
    config_with(&pairs).await
}

#[derive(Default)]
pub struct RecordingChannel {
    pub events: Mutex<Vec<NotificationEvent>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn channel_type(&self) -> &'static str {
        "recording"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, event: &NotificationEvent) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
