//! Client for the Ningmeng partner refund endpoints.
//!
//! Every operation logs in first: a captcha is fetched, solved, and submitted
//! with the pre-encrypted credentials. The `session_id` cookie from a
//! successful login authenticates the following request.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{CaptchaSolver, RefundReceipt, RefundService};
use crate::config::ConfigService;
use crate::config::settings::{NINGMENG_PASSWORD, NINGMENG_USERNAME, RefundSettings};
use crate::{Error, Result};

pub const BASE_URL: &str = "https://www.ningmeng88.com";

const CAPTCHA_PATH: &str = "/web/captcha/info";
const LOGIN_PATH: &str = "/web/user/login";
const REFUND_PATH: &str = "/web/refund/save/partner";
const QUERY_PATH: &str = "/web/refund/list/partner";

const SESSION_COOKIE: &str = "session_id";

/// Attempts for a single POST before its error is returned.
const POST_ATTEMPTS: usize = 3;

/// Captcha rounds before login is given up.
const LOGIN_ATTEMPTS: usize = 10;

/// Status code the login endpoint answers with for a wrong captcha.
const STATUS_RETRY_LOGIN: i64 = 400;

const REFUND_ACCEPTED: [i64; 2] = [200, 206];

/// Common shape of Ningmeng responses.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
}

impl Envelope {
    fn error_text(&self) -> String {
        self.msg
            .clone()
            .unwrap_or_else(|| format!("status code {}", self.status_code))
    }
}

#[derive(Debug, Deserialize)]
struct CaptchaData {
    captcha: String,
    token: String,
}

/// Filters for the partner refund list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundQuery {
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_link: Option<String>,
}

impl Default for RefundQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            receive_order: None,
            order_link: None,
        }
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8,en-GB;q=0.7,en-US;q=0.6"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::ORIGIN, HeaderValue::from_static(BASE_URL));
    headers.insert(header::REFERER, HeaderValue::from_static(BASE_URL));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers
}

/// Interpret a refund submission response.
fn refund_receipt(envelope: Envelope) -> Result<RefundReceipt> {
    if !REFUND_ACCEPTED.contains(&envelope.status_code) {
        return Err(Error::refund(format!(
            "refund request rejected: {}",
            envelope.error_text()
        )));
    }
    let message = match envelope.message {
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    Ok(RefundReceipt { message })
}

pub struct NingmengClient {
    client: Client,
    config: Arc<ConfigService>,
    solver: Arc<dyn CaptchaSolver>,
    base_url: String,
}

impl NingmengClient {
    pub fn new(client: Client, config: Arc<ConfigService>, solver: Arc<dyn CaptchaSolver>) -> Self {
        Self {
            client,
            config,
            solver,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// POST a compact JSON body, retrying transport errors and non-2xx statuses.
    async fn post(&self, path: &str, body: &Value, session: Option<&str>) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        let payload = serde_json::to_vec(body)?;
        let mut last_error = None;

        for attempt in 1..=POST_ATTEMPTS {
            let mut request = self
                .client
                .post(&url)
                .headers(browser_headers())
                .body(payload.clone());
            if let Some(session) = session {
                request = request.header(header::COOKIE, format!("{SESSION_COOKIE}={session}"));
            }

            match request.send().await.and_then(Response::error_for_status) {
                Ok(response) => return Ok(response),
                Err(e) => {
                    debug!(url = %url, attempt, error = %e, "Ningmeng request failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .map(Error::from)
            .unwrap_or_else(|| Error::refund(format!("no response from {url}"))))
    }

    async fn captcha(&self) -> Result<CaptchaData> {
        let envelope: Envelope = self.post(CAPTCHA_PATH, &json!({}), None).await?.json().await?;
        let data = envelope
            .data
            .ok_or_else(|| Error::refund(format!("captcha unavailable: {}", envelope.msg.unwrap_or_default())))?;
        Ok(serde_json::from_value(data)?)
    }

    /// Log in and return the session id.
    pub async fn login(&self) -> Result<String> {
        let settings = RefundSettings::from_config(&self.config);
        if settings.username.is_empty() || settings.password.is_empty() {
            return Err(Error::config(format!(
                "{NINGMENG_USERNAME} and {NINGMENG_PASSWORD} must be set"
            )));
        }

        for attempt in 1..=LOGIN_ATTEMPTS {
            let captcha = self.captcha().await?;
            let answer = self.solver.solve(&captcha.captcha).await?;
            let body = json!({
                "user_name": settings.username,
                "password": settings.password,
                "iv": settings.iv,
                "captcha": answer,
                "captcha_token": captcha.token,
            });

            let response = self.post(LOGIN_PATH, &body, None).await?;
            let session = response
                .cookies()
                .find(|cookie| cookie.name() == SESSION_COOKIE)
                .map(|cookie| cookie.value().to_string());
            let envelope: Envelope = response.json().await?;

            if envelope.status_code == STATUS_RETRY_LOGIN {
                warn!(attempt, reason = %envelope.error_text(), "Ningmeng login rejected, retrying with a new captcha");
                continue;
            }

            return match session {
                Some(session) => {
                    info!(user = %settings.username, attempt, "Logged in to Ningmeng");
                    Ok(session)
                }
                None => Err(Error::refund(format!(
                    "login returned no session: {}",
                    envelope.error_text()
                ))),
            };
        }

        Err(Error::refund(format!(
            "login failed after {LOGIN_ATTEMPTS} captcha attempts"
        )))
    }

    /// Page through submitted refunds.
    pub async fn query(&self, query: &RefundQuery) -> Result<Value> {
        let session = self.login().await?;
        let body = serde_json::to_value(query)?;
        let envelope: Envelope = self
            .post(QUERY_PATH, &body, Some(&session))
            .await?
            .json()
            .await?;
        Ok(envelope.data.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl RefundService for NingmengClient {
    async fn submit(&self, links: &[String]) -> Result<RefundReceipt> {
        if links.is_empty() {
            return Err(Error::validation("no order links to refund"));
        }
        let session = self.login().await?;
        let envelope: Envelope = self
            .post(REFUND_PATH, &json!({ "order_link": links }), Some(&session))
            .await?
            .json()
            .await?;
        refund_receipt(envelope)
    }
}
