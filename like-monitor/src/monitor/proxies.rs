use std::sync::Arc;

use async_trait::async_trait;
use proxy_pool::{ChunkedProvisioner, OwlProxyClient, ProvisioningError, ProxyCredential, ProxyProvisioner};
use reqwest::Client;
use tracing::debug;

use crate::config::ConfigService;
use crate::config::settings::ProxySettings;

/// Provisions through OwlProxy with the credentials configured at call time,
/// so key or country changes apply to the next pass.
pub struct ConfiguredProvisioner {
    config: Arc<ConfigService>,
    client: Client,
}

impl ConfiguredProvisioner {
    pub fn new(config: Arc<ConfigService>, client: Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl ProxyProvisioner for ConfiguredProvisioner {
    async fn acquire(&self, count: usize) -> Result<Vec<ProxyCredential>, ProvisioningError> {
        let settings = ProxySettings::from_config(&self.config);
        debug!(count, settings = ?settings, "Provisioning proxies");
        let upstream = OwlProxyClient::new(self.client.clone(), settings.to_owlproxy_config());
        ChunkedProvisioner::new(upstream).acquire(count).await
    }
}
