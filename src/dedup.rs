//! In-process idempotency gate keyed by broker message id.
//!
//! An entry means the push gateway already accepted a notification for that id.
//! Entries are checked lazily against the TTL and physically removed only by the
//! periodic sweep.
//!
//! The check in the publisher and the mark after a successful POST are two separate
//! lock acquisitions, so two deliveries of the same id racing each other can both be
//! sent. Broker redelivery is not expected to be that tight.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{sync::RwLock, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct DeduplicationCache {
    processed: RwLock<HashMap<String, Instant>>,
    ttl: Duration,
}

impl DeduplicationCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            processed: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn is_duplicate(&self, message_id: &str) -> bool {
        self.is_duplicate_at(message_id, Instant::now()).await
    }

    async fn is_duplicate_at(&self, message_id: &str, now: Instant) -> bool {
        if message_id.is_empty() {
            return false;
        }

        let processed_at = match self.processed.read().await.get(message_id) {
            Some(processed_at) => *processed_at,
            None => return false,
        };

        let age = now.saturating_duration_since(processed_at);
        if age < self.ttl {
            info!(
                message_id,
                age_secs = age.as_secs(),
                "Duplicate message detected"
            );
            return true;
        }

        // Expired but not swept yet.
        false
    }

    pub async fn mark_as_processed(&self, message_id: &str) {
        self.mark_as_processed_at(message_id, Instant::now()).await
    }

    async fn mark_as_processed_at(&self, message_id: &str, now: Instant) {
        if message_id.is_empty() {
            return;
        }

        self.processed
            .write()
            .await
            .insert(message_id.to_string(), now);

        debug!(message_id, "Message marked as processed in deduplication cache");
    }

    pub async fn cache_size(&self) -> usize {
        self.processed.read().await.len()
    }

    /// Removes every entry older than the TTL and returns how many were dropped.
    pub async fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now()).await
    }

    async fn cleanup_at(&self, now: Instant) -> usize {
        let mut processed = self.processed.write().await;
        let before = processed.len();

        processed.retain(|_, processed_at| now.saturating_duration_since(*processed_at) <= self.ttl);

        let removed = before - processed.len();
        if removed > 0 {
            info!(
                removed,
                ttl_secs = self.ttl.as_secs(),
                "Cleaned up expired deduplication entries"
            );
        }

        removed
    }

    /// Runs `cleanup` every `interval` until `shutdown` is cancelled. A zero interval
    /// is replaced by [`DEFAULT_CLEANUP_INTERVAL`].
    pub fn spawn_cleanup_task(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let interval = if interval.is_zero() {
            warn!("Zero deduplication cleanup interval, using the default");
            DEFAULT_CLEANUP_INTERVAL
        } else {
            interval
        };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Deduplication cleanup task stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        cache.cleanup().await;
                    }
                }
            }
        })
    }
}

impl Default for DeduplicationCache {
    fn default() -> Self {
        Self::new()
    }
}
