use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::ConfigService;
use crate::config::settings::{RefundSettings, YUNMA_TOKEN};
use crate::{Error, Result};

pub const YUNMA_ENDPOINT: &str = "http://api.jfbym.com/api/YmServer/customApi";

/// Alphanumeric image captcha.
pub const DEFAULT_CAPTCHA_TYPE: &str = "10103";

/// Turns a base64 captcha image into its text.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    async fn solve(&self, image_base64: &str) -> Result<String>;
}

/// Recognition through the Yunma custom API. The token is read per request.
pub struct YunmaSolver {
    client: Client,
    config: Arc<ConfigService>,
    captcha_type: String,
    endpoint: String,
}

impl YunmaSolver {
    pub fn new(client: Client, config: Arc<ConfigService>) -> Self {
        Self {
            client,
            config,
            captcha_type: DEFAULT_CAPTCHA_TYPE.to_string(),
            endpoint: YUNMA_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// `data.data` of a Yunma response.
fn answer_from(response: &Value) -> Result<String> {
    match response.pointer("/data/data") {
        Some(Value::String(answer)) if !answer.is_empty() => Ok(answer.clone()),
        Some(Value::Number(answer)) => Ok(answer.to_string()),
        _ => {
            let msg = response
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("no answer in response");
            Err(Error::refund(format!("captcha recognition failed: {msg}")))
        }
    }
}

#[async_trait]
impl CaptchaSolver for YunmaSolver {
    async fn solve(&self, image_base64: &str) -> Result<String> {
        let token = RefundSettings::from_config(&self.config).captcha_token;
        if token.is_empty() {
            return Err(Error::config(format!("{YUNMA_TOKEN} is not set")));
        }

        let response: Value = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "token": token,
                "type": self.captcha_type,
                "image": image_base64,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let answer = answer_from(&response)?;
        tracing::debug!(length = answer.len(), "Captcha recognized");
        Ok(answer)
    }
}
