use std::time::Duration;

use async_trait::async_trait;
use proxy_pool::ProxyCredential;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_ENCODING};
use tracing::debug;

use crate::client::ClientCache;
use crate::decode::decode_body;
use crate::douyin::link::{extract_video_id, is_short_link};
use crate::douyin::page::{VideoPage, parse_video_page};
use crate::error::ExtractorError;
use crate::fetcher::{EngagementFetcher, EngagementResult};

pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(15);

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_ZH: &str = "zh-CN,zh;q=0.9,en;q=0.8";

pub struct DouyinFetcher {
    clients: ClientCache,
    resolve_timeout: Duration,
    page_timeout: Duration,
}

impl Default for DouyinFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DouyinFetcher {
    pub fn new() -> Self {
        Self {
            clients: ClientCache::new(),
            resolve_timeout: RESOLVE_TIMEOUT,
            page_timeout: PAGE_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, resolve_timeout: Duration, page_timeout: Duration) -> Self {
        self.resolve_timeout = resolve_timeout;
        self.page_timeout = page_timeout;
        self
    }

    /// Follow a short link to its final URL. Other links are returned unchanged.
    ///
    /// A failed resolution is an error; the short link is never used in its place.
    pub async fn resolve_link(&self, client: &Client, link: &str) -> Result<String, ExtractorError> {
        if !is_short_link(link) {
            return Ok(link.to_string());
        }

        let response = client
            .get(link)
            .timeout(self.resolve_timeout)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_ZH)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| ExtractorError::ResolutionFailed {
                link: link.to_string(),
                reason: e.to_string(),
            })?;

        let resolved = response.url().to_string();
        debug!(link = %link, resolved = %resolved, "Resolved short link");
        Ok(resolved)
    }

    async fn fetch_page(&self, client: &Client, url: &str) -> Result<String, ExtractorError> {
        let response = client
            .get(url)
            .timeout(self.page_timeout)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_ZH)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::UnexpectedStatus(status.as_u16()));
        }

        let encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        decode_body(encoding.as_deref(), &body)
    }

    /// Resolve, download and parse the page behind `link`.
    pub async fn fetch_page_details(
        &self,
        link: &str,
        proxy: Option<&ProxyCredential>,
    ) -> Result<VideoPage, ExtractorError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(ExtractorError::InvalidUrl("empty link".to_string()));
        }

        let client = self.clients.get_or_create(proxy)?;
        let resolved = self.resolve_link(&client, link).await?;

        let video_id = extract_video_id(&resolved);
        debug!(video_id = %video_id, fallback_id = video_id.is_fallback, "Fetching video page");

        let html = self.fetch_page(&client, &resolved).await?;
        Ok(parse_video_page(&html))
    }
}

#[async_trait]
impl EngagementFetcher for DouyinFetcher {
    async fn fetch(&self, link: &str, proxy: Option<&ProxyCredential>) -> EngagementResult {
        match self.fetch_page_details(link, proxy).await {
            Ok(page) => EngagementResult::ok(page),
            Err(e) => EngagementResult::failed(e.to_string()),
        }
    }
}
