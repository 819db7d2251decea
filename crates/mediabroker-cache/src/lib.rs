//! Cache-aside layer for media records, keyed by logical key.
//!
//! The cache is an optimization only: correctness must hold with the cache
//! disabled or empty at all times. Reads fall back to the metadata store on
//! miss and repopulate the cache before returning. Misses are not cached.

use async_trait::async_trait;
use mediabroker_core::models::MediaRecord;
use moka::future::Cache;
use std::time::Duration;

/// Capability surface of the record cache.
#[async_trait]
pub trait MediaCache: Send + Sync {
    /// Look up a record by logical key. `None` is always safe: callers fall
    /// back to the metadata store.
    async fn get(&self, logical_key: &str) -> Option<MediaRecord>;

    /// Write-through a record under its logical key. Entries expire after
    /// the cache-wide TTL.
    async fn set(&self, logical_key: &str, record: MediaRecord);
}

/// In-process TTL cache backed by moka.
#[derive(Clone)]
pub struct MokaMediaCache {
    inner: Cache<String, MediaRecord>,
}

impl MokaMediaCache {
    /// All entries share one TTL; there is no explicit invalidation and no
    /// negative caching.
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_capacity)
            .build();
        Self { inner }
    }
}

#[async_trait]
impl MediaCache for MokaMediaCache {
    async fn get(&self, logical_key: &str) -> Option<MediaRecord> {
        self.inner.get(logical_key).await
    }

    async fn set(&self, logical_key: &str, record: MediaRecord) {
        tracing::debug!(logical_key = %logical_key, "Caching media record");
        self.inner.insert(logical_key.to_string(), record).await;
    }
}
