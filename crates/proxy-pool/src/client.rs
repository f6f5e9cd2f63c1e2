use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE as CONTENT_TYPE_HEADER};
use tracing::{debug, warn};

use crate::credential::ProxyCredential;
use crate::error::ProvisioningError;
use crate::models::{ApiResponse, CreateProxyRequest, ProxyItem};
use crate::provisioner::ProxyUpstream;
use crate::signer::{self, CONTENT_TYPE, SIGNED_HEADERS};

pub const DEFAULT_API_BASE: &str = "https://api.owlproxy.com";
pub const CREATE_PROXY_PATH: &str = "/owlproxy/api/openApi/vcDynamicGood/createProxy";
pub const DEFAULT_PROXY_HOST: &str = "change5.owlproxy.com:7778";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for the provisioning API.
#[derive(Debug, Clone)]
pub struct OwlProxyConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub country_code: String,
    pub state: String,
    pub city: String,
    pub proxy_host: String,
    pub proxy_type: String,
    /// Credential lifetime in minutes.
    pub lifetime_minutes: u32,
    pub api_base: String,
    pub timeout: Duration,
}

impl OwlProxyConfig {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            country_code: String::new(),
            state: String::new(),
            city: String::new(),
            proxy_host: DEFAULT_PROXY_HOST.to_string(),
            proxy_type: "http".to_string(),
            lifetime_minutes: 5,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    /// Set the lifetime from seconds, rounded down to whole minutes (at least one).
    pub fn with_lifetime_secs(mut self, secs: u64) -> Self {
        self.lifetime_minutes = u32::try_from(secs / 60).unwrap_or(u32::MAX).max(1);
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn build_request(&self, count: usize) -> CreateProxyRequest {
        CreateProxyRequest {
            country_code: self.country_code.clone(),
            state: self.state.clone(),
            city: self.city.clone(),
            proxy_host: self.proxy_host.clone(),
            proxy_type: self.proxy_type.clone(),
            time: self.lifetime_minutes,
            good_num: count,
        }
    }

    fn validate(&self) -> Result<(), ProvisioningError> {
        if self.access_key_id.is_empty() {
            return Err(ProvisioningError::MissingCredential("access key id"));
        }
        if self.secret_access_key.is_empty() {
            return Err(ProvisioningError::MissingCredential("secret access key"));
        }
        Ok(())
    }
}

/// Client for the dynamic proxy provisioning endpoint.
///
/// One call creates at most one batch; chunking lives in
/// [`ChunkedProvisioner`](crate::provisioner::ChunkedProvisioner).
pub struct OwlProxyClient {
    client: Client,
    config: OwlProxyConfig,
}

impl OwlProxyClient {
    pub fn new(client: Client, config: OwlProxyConfig) -> Self {
        Self { client, config }
    }

    /// Send a signed POST and decode the response envelope.
    async fn signed_post<T>(&self, path: &str, body: String) -> Result<ApiResponse<T>, ProvisioningError>
    where
        T: serde::de::DeserializeOwned,
    {
        let x_date = signer::format_x_date(Utc::now());
        let sig = signer::calculate_signature(
            &body,
            &x_date,
            CONTENT_TYPE,
            SIGNED_HEADERS,
            &self.config.secret_access_key,
        );
        let authorization =
            signer::authorization_header(&self.config.access_key_id, &x_date, &sig.signature);

        let url = format!("{}{}", self.config.api_base.trim_end_matches('/'), path);
        let response = self
            .client
            .post(&url)
            .timeout(self.config.timeout)
            .header(CONTENT_TYPE_HEADER, CONTENT_TYPE)
            .header("x-content-sha256", &sig.content_sha256)
            .header("x-date", &x_date)
            .header(AUTHORIZATION, authorization)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ProvisioningError::UpstreamStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ProxyUpstream for OwlProxyClient {
    async fn create_batch(&self, count: usize) -> Result<Vec<ProxyCredential>, ProvisioningError> {
        self.config.validate()?;

        let body = serde_json::to_string(&self.config.build_request(count))?;
        debug!(count, "Requesting proxy batch");

        let response: ApiResponse<Vec<ProxyItem>> =
            self.signed_post(CREATE_PROXY_PATH, body).await?;

        if !response.is_success() {
            return Err(ProvisioningError::Rejected {
                code: response.code,
                msg: response.msg,
            });
        }

        let items = response.data.ok_or_else(|| {
            ProvisioningError::MalformedResponse("response has no data field".to_string())
        })?;

        let mut credentials = Vec::with_capacity(items.len());
        for item in items {
            match ProxyCredential::try_from(item) {
                Ok(cred) => credentials.push(cred),
                Err(e) => warn!(error = %e, "Skipping unusable proxy item"),
            }
        }

        debug!(requested = count, received = credentials.len(), "Proxy batch received");
        Ok(credentials)
    }
}
