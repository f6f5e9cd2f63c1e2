//! Statistics extraction from a video share page.
//!
//! The page embeds its state as `window._ROUTER_DATA = {...}`. When that block
//! is missing, unparsable, or reports zero likes, the counters are matched
//! directly against the raw markup instead.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::utils::{capture_group_1_owned, capture_u64_or_zero, json_u64};

static ROUTER_DATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)window\._ROUTER_DATA\s*=\s*(\{.+?\});").unwrap());
static ROUTER_DATA_SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)window\._ROUTER_DATA\s*=\s*(\{.+?\})</script>").unwrap());

static DIGG_PRESENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""digg_count":\s*\d+"#).unwrap());
static DIGG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""digg_count":\s*(\d+)"#).unwrap());
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""comment_count":\s*(\d+)"#).unwrap());
static SHARE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""share_count":\s*(\d+)"#).unwrap());
static PLAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""play_count":\s*(\d+)"#).unwrap());
static COLLECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""collect_count":\s*(\d+)"#).unwrap());
static FORWARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""forward_count":\s*(\d+)"#).unwrap());

static AUTHOR_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"data-author="([^"]+)""#).unwrap());
static AUTHOR_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""nickname":"([^"]+)""#).unwrap());
static DESC_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"data-desc="([^"]+)""#).unwrap());
static DESC_META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"description[^>]*content="([^"]+)""#).unwrap());
static COVER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""cover":\{"url_list":\["([^"]+)""#).unwrap());
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""hashtag_name":"([^"]+)""#).unwrap());

const PLAY_ENDPOINT: &str = "https://aweme.snssdk.com/aweme/v1/play/";

/// Public counters of one video. Missing fields are `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStats {
    pub like_count: u64,
    pub comment_count: u64,
    pub share_count: u64,
    pub play_count: u64,
    pub collect_count: u64,
    pub forward_count: u64,
}

impl VideoStats {
    fn from_statistics(stats: &Value) -> Self {
        Self {
            like_count: json_u64(stats.get("digg_count")),
            comment_count: json_u64(stats.get("comment_count")),
            share_count: json_u64(stats.get("share_count")),
            play_count: json_u64(stats.get("play_count")),
            collect_count: json_u64(stats.get("collect_count")),
            forward_count: json_u64(stats.get("forward_count")),
        }
    }

    fn from_markup(html: &str) -> Self {
        Self {
            like_count: capture_u64_or_zero(&DIGG_RE, html),
            comment_count: capture_u64_or_zero(&COMMENT_RE, html),
            share_count: capture_u64_or_zero(&SHARE_RE, html),
            play_count: capture_u64_or_zero(&PLAY_RE, html),
            collect_count: capture_u64_or_zero(&COLLECT_RE, html),
            forward_count: capture_u64_or_zero(&FORWARD_RE, html),
        }
    }
}

/// Everything extracted from a share page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPage {
    pub stats: VideoStats,
    pub author: Option<String>,
    pub description: Option<String>,
    pub play_url: Option<String>,
    pub cover_url: Option<String>,
    pub hashtags: Vec<String>,
}

/// Parse the embedded router state, trying the `;`-terminated form first.
fn parse_router_data(html: &str) -> Option<Value> {
    [&*ROUTER_DATA_RE, &*ROUTER_DATA_SCRIPT_RE]
        .into_iter()
        .filter_map(|re| re.captures(html).and_then(|caps| caps.get(1)))
        .find_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
}

/// `loaderData["video_(id)/page"].videoInfoRes.item_list[0]`
fn first_item(router_data: &Value) -> Option<&Value> {
    router_data
        .get("loaderData")?
        .get("video_(id)/page")?
        .get("videoInfoRes")?
        .get("item_list")?
        .as_array()?
        .first()
}

pub fn parse_video_page(html: &str) -> VideoPage {
    let router_data = parse_router_data(html);
    let item = router_data.as_ref().and_then(first_item);

    let mut stats = item
        .and_then(|item| item.get("statistics"))
        .map(VideoStats::from_statistics)
        .unwrap_or_default();

    if stats.like_count == 0 && DIGG_PRESENT_RE.is_match(html) {
        debug!("Falling back to markup statistics");
        stats = VideoStats::from_markup(html);
    }

    let play_url = item
        .and_then(|item| item.pointer("/video/play_addr/uri"))
        .and_then(Value::as_str)
        .filter(|uri| !uri.is_empty())
        .map(|uri| format!("{PLAY_ENDPOINT}?video_id={uri}&ratio=720p&line=0"));

    VideoPage {
        stats,
        author: capture_group_1_owned(&AUTHOR_ATTR_RE, html)
            .or_else(|| capture_group_1_owned(&AUTHOR_JSON_RE, html)),
        description: capture_group_1_owned(&DESC_ATTR_RE, html)
            .or_else(|| capture_group_1_owned(&DESC_META_RE, html)),
        play_url,
        cover_url: capture_group_1_owned(&COVER_RE, html),
        hashtags: HASHTAG_RE
            .captures_iter(html)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect(),
    }
}
