use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("upstream rejected request (code {code}): {msg}")]
    Rejected { code: i64, msg: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("request {index} of {total} failed: {source}")]
    ChunkFailed {
        index: usize,
        total: usize,
        #[source]
        source: Box<ProvisioningError>,
    },
}
