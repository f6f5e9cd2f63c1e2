pub mod fetcher;
pub mod link;
pub mod page;

pub use fetcher::DouyinFetcher;
pub use link::{VideoId, extract_video_id, is_short_link};
pub use page::{VideoPage, VideoStats, parse_video_page};
