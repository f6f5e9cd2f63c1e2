use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::credential::ProxyCredential;
use crate::error::ProvisioningError;

/// Upstream cap on credentials created by a single request.
pub const MAX_PER_REQUEST: usize = 50;

/// Pause between consecutive upstream requests.
pub const DEFAULT_CHUNK_PAUSE: Duration = Duration::from_secs(1);

/// A single physical provisioning request.
#[async_trait]
pub trait ProxyUpstream: Send + Sync {
    async fn create_batch(&self, count: usize) -> Result<Vec<ProxyCredential>, ProvisioningError>;
}

/// Acquires a pool of proxy credentials for one verification pass.
#[async_trait]
pub trait ProxyProvisioner: Send + Sync {
    /// Acquire up to `count` credentials.
    ///
    /// An empty result means the upstream handed out nothing; callers must treat
    /// it as a total failure.
    async fn acquire(&self, count: usize) -> Result<Vec<ProxyCredential>, ProvisioningError>;
}

/// Splits large requests into sequential upstream calls of at most
/// [`MAX_PER_REQUEST`] credentials, pausing between calls.
///
/// Any failing sub-request fails the whole acquisition; nothing accumulated so far is returned.
pub struct ChunkedProvisioner<U> {
    upstream: U,
    chunk_size: usize,
    pause: Duration,
}

impl<U: ProxyUpstream> ChunkedProvisioner<U> {
    pub fn new(upstream: U) -> Self {
        Self {
            upstream,
            chunk_size: MAX_PER_REQUEST,
            pause: DEFAULT_CHUNK_PAUSE,
        }
    }

    /// Override the chunk size (clamped to `1..=MAX_PER_REQUEST`).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_PER_REQUEST);
        self
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Sizes of the upstream requests needed for `count` credentials.
    pub fn chunk_sizes(&self, count: usize) -> Vec<usize> {
        let mut sizes = Vec::with_capacity(count.div_ceil(self.chunk_size));
        let mut remaining = count;
        while remaining > 0 {
            let size = remaining.min(self.chunk_size);
            sizes.push(size);
            remaining -= size;
        }
        sizes
    }
}

#[async_trait]
impl<U: ProxyUpstream> ProxyProvisioner for ChunkedProvisioner<U> {
    async fn acquire(&self, count: usize) -> Result<Vec<ProxyCredential>, ProvisioningError> {
        let sizes = self.chunk_sizes(count);
        let total = sizes.len();
        let mut credentials = Vec::with_capacity(count);

        for (index, size) in sizes.into_iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            debug!(request = index + 1, total, size, "Provisioning proxy chunk");
            let batch = self.upstream.create_batch(size).await.map_err(|e| {
                warn!(request = index + 1, total, error = %e, "Proxy provisioning request failed");
                ProvisioningError::ChunkFailed {
                    index: index + 1,
                    total,
                    source: Box::new(e),
                }
            })?;
            credentials.extend(batch);
        }

        info!(requested = count, received = credentials.len(), "Proxy pool provisioned");
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::ProxyScheme;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingUpstream {
        calls: Mutex<Vec<(usize, Instant)>>,
        fail_on_call: Option<usize>,
    }

    #[async_trait]
    impl ProxyUpstream for RecordingUpstream {
        async fn create_batch(
            &self,
            count: usize,
        ) -> Result<Vec<ProxyCredential>, ProvisioningError> {
            let call = {
                let mut calls = self.calls.lock();
                calls.push((count, Instant::now()));
                calls.len()
            };
            if self.fail_on_call == Some(call) {
                return Err(ProvisioningError::Rejected {
                    code: 500,
                    msg: "quota exceeded".to_string(),
                });
            }
            Ok((0..count)
                .map(|i| {
                    ProxyCredential::new(
                        ProxyScheme::Http,
                        format!("10.0.{call}.{i}"),
                        8000,
                        "user",
                        "pass",
                    )
                })
                .collect())
        }
    }

    #[test]
    fn test_chunk_sizes() {
        let provisioner = ChunkedProvisioner::new(RecordingUpstream::default());
        assert_eq!(provisioner.chunk_sizes(120), vec![50, 50, 20]);
        assert_eq!(provisioner.chunk_sizes(50), vec![50]);
        assert_eq!(provisioner.chunk_sizes(1), vec![1]);
        assert!(provisioner.chunk_sizes(0).is_empty());
    }

    #[test]
    fn test_chunk_size_is_clamped() {
        let provisioner = ChunkedProvisioner::new(RecordingUpstream::default()).with_chunk_size(500);
        assert_eq!(provisioner.chunk_sizes(120), vec![50, 50, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_chunks_with_pause() {
        let provisioner = ChunkedProvisioner::new(RecordingUpstream::default());

        let credentials = provisioner.acquire(120).await.unwrap();
        assert_eq!(credentials.len(), 120);

        let calls = provisioner.upstream.calls.lock();
        let sizes: Vec<usize> = calls.iter().map(|(size, _)| *size).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        for pair in calls.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= DEFAULT_CHUNK_PAUSE);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_preserves_chunk_order() {
        let provisioner = ChunkedProvisioner::new(RecordingUpstream::default());
        let credentials = provisioner.acquire(60).await.unwrap();
        assert_eq!(credentials[0].host, "10.0.1.0");
        assert_eq!(credentials[49].host, "10.0.1.49");
        assert_eq!(credentials[50].host, "10.0.2.0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_fails_whole_call_on_sub_failure() {
        let provisioner = ChunkedProvisioner::new(RecordingUpstream {
            fail_on_call: Some(2),
            ..Default::default()
        });

        let err = provisioner.acquire(120).await.unwrap_err();
        assert!(matches!(
            err,
            ProvisioningError::ChunkFailed {
                index: 2,
                total: 3,
                ..
            }
        ));
        // The third request is never sent.
        assert_eq!(provisioner.upstream.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_single_chunk_has_no_pause() {
        let provisioner = ChunkedProvisioner::new(RecordingUpstream::default())
            .with_pause(Duration::from_secs(3600));
        let credentials = provisioner.acquire(10).await.unwrap();
        assert_eq!(credentials.len(), 10);
    }
}
