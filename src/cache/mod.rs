//! In-process TTL cache for assembled dashboard responses.
//!
//! Values are stored as `serde_json::Value` so one cache serves every
//! response shape. Expired entries are dropped lazily on lookup; there is
//! no single-flight coordination, so concurrent misses for one key may run
//! the producer more than once and last write wins.

pub mod key;

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

pub use key::build_cache_key;

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Shared read-through cache keyed by [`build_cache_key`] strings.
pub struct TtlCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, or run `producer`, store its
    /// result for `ttl`, and return it. Producer errors are propagated and
    /// nothing is cached for them.
    pub async fn get_or_set<T, F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: From<serde_json::Error>,
    {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                if entry.expires_at > Instant::now() {
                    debug!(key, "cache hit");
                    return Ok(serde_json::from_value(entry.value.clone())?);
                }
            }
        }

        debug!(key, "cache miss");
        let produced = producer().await?;
        let value = serde_json::to_value(&produced)?;

        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(produced)
    }

    /// Drop every cached entry. Used by tests and could back an admin
    /// invalidation endpoint.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}
