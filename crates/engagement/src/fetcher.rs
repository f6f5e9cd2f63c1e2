use async_trait::async_trait;
use proxy_pool::ProxyCredential;
use serde::Serialize;

use crate::douyin::page::VideoPage;

/// Outcome of a single engagement lookup.
///
/// `success == false` carries the failure reason; a successful zero count is a
/// real observation and must not be confused with a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementResult {
    pub success: bool,
    pub count: u64,
    pub error: Option<String>,
    pub page: Option<VideoPage>,
}

impl EngagementResult {
    pub fn ok(page: VideoPage) -> Self {
        Self {
            success: true,
            count: page.stats.like_count,
            error: None,
            page: Some(page),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            error: Some(error.into()),
            page: None,
        }
    }
}

/// Looks up the current public like count behind a share link.
///
/// Implementations never return errors: every failure is folded into
/// [`EngagementResult::failed`].
#[async_trait]
pub trait EngagementFetcher: Send + Sync {
    async fn fetch(&self, link: &str, proxy: Option<&ProxyCredential>) -> EngagementResult;
}
