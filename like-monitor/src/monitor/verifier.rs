//! Concurrent verification of current like counts.
//!
//! One pass provisions a credential pool up front, then fetches every order's
//! count through a bounded number of concurrent lookups. Each order retries
//! across its own window of candidate proxies.

use std::sync::Arc;

use engagement_parser::EngagementFetcher;
use futures::stream::{self, StreamExt};
use proxy_pool::{ProxyCredential, ProxyProvisioner};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::domain::Order;

/// Distinct proxies considered for one order.
pub const CANDIDATES_PER_ORDER: usize = 3;

/// Fetch attempts per order before giving up.
pub const MAX_ATTEMPTS: usize = 3;

/// Current like count of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "count", rename_all = "snake_case")]
pub enum FetchOutcome {
    Resolved(u64),
    /// Every attempt failed. The count is unknown and never read as zero.
    Unresolved,
}

impl FetchOutcome {
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Resolved(count) => Some(*count),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Pool indices tried for the order at `index`: up to [`CANDIDATES_PER_ORDER`]
/// consecutive slots starting at `index % pool_len`, wrapping around.
pub fn candidate_window(pool_len: usize, index: usize) -> Vec<usize> {
    if pool_len == 0 {
        return Vec::new();
    }
    (0..CANDIDATES_PER_ORDER.min(pool_len))
        .map(|k| (index + k) % pool_len)
        .collect()
}

pub struct BatchVerifier {
    provisioner: Arc<dyn ProxyProvisioner>,
    fetcher: Arc<dyn EngagementFetcher>,
}

impl BatchVerifier {
    pub fn new(provisioner: Arc<dyn ProxyProvisioner>, fetcher: Arc<dyn EngagementFetcher>) -> Self {
        Self {
            provisioner,
            fetcher,
        }
    }

    /// Fetch the current count of every order.
    ///
    /// The result is index-aligned with `orders`. An empty batch returns at once
    /// without provisioning. If no credentials can be
    /// provisioned, every order is [`FetchOutcome::Unresolved`] and nothing is fetched.
    pub async fn verify(&self, orders: &[Order], max_workers: usize) -> Vec<FetchOutcome> {
        // Credentials are paid for; an empty batch must not buy any.
        if orders.is_empty() {
            debug!("No orders to verify");
            return Vec::new();
        }

        let proxies = match self.provisioner.acquire(orders.len()).await {
            Ok(proxies) => proxies,
            Err(e) => {
                error!(orders = orders.len(), error = %e, "Proxy provisioning failed, marking batch unresolved");
                Vec::new()
            }
        };

        if proxies.is_empty() {
            warn!(orders = orders.len(), "No proxy credentials available, skipping fetches");
            return vec![FetchOutcome::Unresolved; orders.len()];
        }

        let workers = max_workers.min(orders.len()).max(1);
        info!(
            orders = orders.len(),
            proxies = proxies.len(),
            workers,
            "Verifying like counts"
        );

        let lookups: Vec<_> = orders
            .iter()
            .enumerate()
            .map(|(index, order)| self.verify_one(index, order, &proxies))
            .collect();
        // `buffered` yields in submission order, so outcomes stay index-aligned.
        let outcomes: Vec<FetchOutcome> = stream::iter(lookups).buffered(workers).collect().await;

        let resolved = outcomes.iter().filter(|o| o.is_resolved()).count();
        info!(
            orders = orders.len(),
            resolved,
            unresolved = orders.len() - resolved,
            "Verification finished"
        );
        outcomes
    }

    async fn verify_one(&self, index: usize, order: &Order, proxies: &[ProxyCredential]) -> FetchOutcome {
        if order.link.trim().is_empty() {
            warn!(order_id = order.id, order_sn = %order.order_sn, "Order has no link");
            return FetchOutcome::Unresolved;
        }

        let candidates = candidate_window(proxies.len(), index);
        for attempt in 0..MAX_ATTEMPTS {
            let proxy = &proxies[candidates[attempt % candidates.len()]];
            let result = self.fetcher.fetch(&order.link, Some(proxy)).await;

            if result.success {
                debug!(
                    order_id = order.id,
                    attempt = attempt + 1,
                    proxy = %proxy.label(),
                    count = result.count,
                    "Like count fetched"
                );
                return FetchOutcome::Resolved(result.count);
            }

            warn!(
                order_id = order.id,
                attempt = attempt + 1,
                proxy = %proxy.label(),
                error = result.error.as_deref().unwrap_or("unknown error"),
                "Like count fetch failed"
            );
        }

        warn!(order_id = order.id, link = %order.link, "Like count unresolved after retries");
        FetchOutcome::Unresolved
    }
}
