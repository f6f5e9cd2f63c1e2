use std::{sync::OnceLock, time::Duration};

use parking_lot::Mutex;
use proxy_pool::ProxyCredential;
use reqwest::{Client, ClientBuilder};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::ExtractorError;

pub const DEFAULT_MOBILE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1";

/// Upper bound for any single request made through these clients.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const MAX_REDIRECTS: usize = 10;

/// Credentials expire within minutes, so the cache is flushed once it grows past this.
const MAX_CACHED_CLIENTS: usize = 512;

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Client builder with the mobile user agent, redirect following and an optional proxy.
pub fn create_client_builder(
    proxy: Option<&ProxyCredential>,
) -> Result<ClientBuilder, ExtractorError> {
    install_rustls_provider();

    let mut builder = Client::builder()
        .user_agent(DEFAULT_MOBILE_UA)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(DEFAULT_TIMEOUT);

    if let Some(cred) = proxy {
        let proxy = cred
            .to_reqwest_proxy()
            .map_err(|e| ExtractorError::InvalidProxy {
                label: cred.label(),
                reason: e.to_string(),
            })?;
        builder = builder.proxy(proxy);
    }

    Ok(builder)
}

/// One `reqwest::Client` per proxy credential.
///
/// Connection pools are bound to the proxy a client was built with, so clients
/// cannot be shared across credentials.
#[derive(Default)]
pub struct ClientCache {
    clients: Mutex<FxHashMap<Option<ProxyCredential>, Client>>,
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, proxy: Option<&ProxyCredential>) -> Result<Client, ExtractorError> {
        let key = proxy.cloned();
        if let Some(client) = self.clients.lock().get(&key) {
            return Ok(client.clone());
        }

        let client = create_client_builder(proxy)?.build()?;

        let mut clients = self.clients.lock();
        if clients.len() >= MAX_CACHED_CLIENTS {
            debug!(cached = clients.len(), "Flushing HTTP client cache");
            clients.clear();
        }
        Ok(clients.entry(key).or_insert(client).clone())
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    pub fn clear(&self) {
        self.clients.lock().clear();
    }
}
