use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::utils::capture_group_1;

pub const SHORT_LINK_HOST: &str = "v.douyin.com";

/// Content id patterns, tried in order; the first match wins.
static VIDEO_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/video/(\d+)",
        r"/share/video/(\d+)",
        r"aweme_id=(\d+)",
        r"modal_id=(\d+)",
        r"/(\d{19})/",
        r"/(\d{18})/",
        r"item_ids=(\d+)",
        r"/note/(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Content identifier extracted from a resolved link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoId {
    pub value: String,
    /// Synthesized from the clock because no pattern matched; only meaningful in logs.
    pub is_fallback: bool,
}

impl VideoId {
    fn fallback() -> Self {
        Self {
            value: chrono::Utc::now().timestamp_millis().to_string(),
            is_fallback: true,
        }
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// Whether the link points at the short-link redirector and must be resolved first.
pub fn is_short_link(link: &str) -> bool {
    match Url::parse(link.trim()) {
        Ok(url) => url.host_str() == Some(SHORT_LINK_HOST),
        Err(_) => link.contains(SHORT_LINK_HOST),
    }
}

/// Extract the content id from a resolved URL, falling back to the current epoch millis.
pub fn extract_video_id(url: &str) -> VideoId {
    VIDEO_ID_PATTERNS
        .iter()
        .find_map(|re| capture_group_1(re, url))
        .map(|id| VideoId {
            value: id.to_string(),
            is_fallback: false,
        })
        .unwrap_or_else(VideoId::fallback)
}
