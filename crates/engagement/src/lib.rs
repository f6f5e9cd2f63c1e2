//! Share-link resolution and public engagement statistics.
//!
//! The entry point is [`EngagementFetcher`]; [`douyin::DouyinFetcher`] is the
//! implementation for Douyin share links.

pub mod client;
pub mod decode;
pub mod douyin;
pub mod error;
pub mod fetcher;
pub mod utils;

pub use client::{ClientCache, create_client_builder, install_rustls_provider};
pub use error::ExtractorError;
pub use fetcher::{EngagementFetcher, EngagementResult};
