//! HMAC-SHA256 request signing for the provisioning API.
//!
//! The signature is derived in four steps:
//! 1. hash the request body (`x-content-sha256`)
//! 2. hash a canonical header block built from the date, content type and body hash
//! 3. combine the algorithm tag, date, credential scope and canonical hash into a string to sign
//! 4. sign it with a key derived from the secret through the date, service and `request` stages
//!
//! Everything here is pure, so the output depends only on the body, date and secret.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNING_ALGORITHM: &str = "HMAC-SHA256";
pub const SERVICE: &str = "armcloud-paas";
pub const CONTENT_TYPE: &str = "application/json;charset=UTF-8";
pub const SIGNED_HEADERS: &str = "content-type;host;x-content-sha256;x-date";

/// Format of the `x-date` header, always in UTC.
pub const X_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// The upstream verifies the canonical block against a literal `null` host,
/// regardless of the `host` header actually sent.
const CANONICAL_HOST: &str = "null";

/// Output of [`calculate_signature`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Hex-encoded final signature.
    pub signature: String,
    /// Hex-encoded SHA-256 of the request body, sent as `x-content-sha256`.
    pub content_sha256: String,
}

/// Format a timestamp as an `x-date` header value.
pub fn format_x_date(now: DateTime<Utc>) -> String {
    now.format(X_DATE_FORMAT).to_string()
}

/// The `YYYYMMDD` prefix of an `x-date` value.
fn short_date(x_date: &str) -> &str {
    x_date.get(..8).unwrap_or(x_date)
}

fn credential_scope(short_date: &str) -> String {
    format!("{short_date}/{SERVICE}/request")
}

fn hmac_sha256(key: &[u8], content: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(content.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Derive the per-date signing key: secret -> date -> service -> `request`.
fn derive_signing_key(secret: &str, short_date: &str) -> Vec<u8> {
    let k_date = hmac_sha256(secret.as_bytes(), short_date);
    let k_service = hmac_sha256(&k_date, SERVICE);
    hmac_sha256(&k_service, "request")
}

/// Compute the request signature and body hash.
///
/// `content_type` is normalized by stripping spaces before it enters the canonical block.
pub fn calculate_signature(
    body: &str,
    x_date: &str,
    content_type: &str,
    signed_headers: &str,
    secret: &str,
) -> Signature {
    let content_sha256 = sha256_hex(body.as_bytes());
    let content_type = content_type.replace(' ', "");
    let short_date = short_date(x_date);

    let canonical = format!(
        "host:{CANONICAL_HOST}\nx-date:{x_date}\ncontent-type:{content_type}\nsignedHeaders:{signed_headers}\nx-content-sha256:{content_sha256}"
    );
    let canonical_hash = sha256_hex(canonical.as_bytes());

    let string_to_sign = format!(
        "{SIGNING_ALGORITHM}\n{x_date}\n{}\n{canonical_hash}",
        credential_scope(short_date)
    );

    let signing_key = derive_signing_key(secret, short_date);
    let signature = hex::encode(hmac_sha256(&signing_key, &string_to_sign));

    Signature {
        signature,
        content_sha256,
    }
}

/// Build the `authorization` header value for a signed request.
pub fn authorization_header(access_key_id: &str, x_date: &str, signature: &str) -> String {
    format!(
        "{SIGNING_ALGORITHM} Credential={access_key_id}/{}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
        credential_scope(short_date(x_date))
    )
}
