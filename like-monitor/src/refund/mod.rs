//! Automatic refund submission for deficient orders.

pub mod captcha;
pub mod ningmeng;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::Result;

pub use captcha::{CaptchaSolver, YunmaSolver};
pub use ningmeng::NingmengClient;

/// Attempts per product before a submission is given up.
pub const REFUND_ATTEMPTS: usize = 3;

/// Server acknowledgement of a refund request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundReceipt {
    pub message: String,
}

/// Submits refund requests for order links.
#[async_trait]
pub trait RefundService: Send + Sync {
    async fn submit(&self, links: &[String]) -> Result<RefundReceipt>;
}

/// Result of submitting one product's links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundOutcome {
    pub product_name: String,
    pub links: usize,
    pub attempts: usize,
    pub success: bool,
    pub message: String,
}

/// Submit `links` for `product_name`, retrying up to `max_attempts` times.
///
/// Failures are logged and reported in the outcome, never returned as errors.
pub async fn submit_with_retry(
    service: &dyn RefundService,
    product_name: &str,
    links: &[String],
    max_attempts: usize,
) -> RefundOutcome {
    let max_attempts = max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        match service.submit(links).await {
            Ok(receipt) => {
                info!(
                    product = %product_name,
                    links = links.len(),
                    attempt,
                    response = %receipt.message,
                    "Refund request submitted"
                );
                return RefundOutcome {
                    product_name: product_name.to_string(),
                    links: links.len(),
                    attempts: attempt,
                    success: true,
                    message: receipt.message,
                };
            }
            Err(e) => {
                warn!(product = %product_name, attempt, error = %e, "Refund request failed");
                last_error = e.to_string();
            }
        }
    }

    error!(
        product = %product_name,
        links = links.len(),
        attempts = max_attempts,
        error = %last_error,
        "Giving up on refund request"
    );
    RefundOutcome {
        product_name: product_name.to_string(),
        links: links.len(),
        attempts: max_attempts,
        success: false,
        message: last_error,
    }
}
