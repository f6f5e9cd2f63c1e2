//! Wire models for the proxy provisioning API.

use serde::{Deserialize, Serialize};

/// Body of `POST /owlproxy/api/openApi/vcDynamicGood/createProxy`.
///
/// Field order matters: the compact JSON serialization of this struct is what gets signed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProxyRequest {
    pub country_code: String,
    pub state: String,
    pub city: String,
    pub proxy_host: String,
    pub proxy_type: String,
    /// Credential lifetime in minutes.
    pub time: u32,
    pub good_num: usize,
}

/// Common response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub ts: i64,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// The upstream reports success as either `0` or `200`.
    pub fn is_success(&self) -> bool {
        self.code == 0 || self.code == 200
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyItem {
    pub proxy_host: String,
    #[serde(default)]
    pub proxy_port: u16,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub proxy_type: String,
}
