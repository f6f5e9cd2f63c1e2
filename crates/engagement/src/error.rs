use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("short link resolution failed for {link}: {reason}")]
    ResolutionFailed { link: String, reason: String },
    #[error("page returned status {0}")]
    UnexpectedStatus(u16),
    #[error("decode error: {0}")]
    DecodeError(String),
    #[error("invalid proxy {label}: {reason}")]
    InvalidProxy { label: String, reason: String },
}
