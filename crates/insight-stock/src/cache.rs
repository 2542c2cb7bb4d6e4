//! Expiring store for upstream session tokens
//!
//! Yahoo hands out a cookie-bound crumb that must accompany quoteSummary
//! requests. It is kept here with a lifespan, and dropped wholesale when the
//! provider detects a rejected session.

use cached::{Cached, TimedCache};
use std::time::Duration;
use tokio::sync::RwLock;

/// Thread-safe, time-bounded key/value store for session tokens
pub struct SessionCache {
    cache: RwLock<TimedCache<String, String>>,
}

impl SessionCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: RwLock::new(TimedCache::with_lifespan(ttl)),
        }
    }

    /// Get a live value
    pub async fn get(&self, key: &str) -> Option<String> {
        // TimedCache evicts on read, so lookups need the write lock.
        let mut cache = self.cache.write().await;
        cache.cache_get(&key.to_string()).cloned()
    }

    /// Insert a value
    pub async fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key.into(), value.into());
    }

    /// Get a live value or produce and store a new one
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetcher: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String, E>>,
    {
        if let Some(value) = self.get(key).await {
            tracing::trace!(key, "Session cache hit");
            return Ok(value);
        }

        tracing::debug!(key, "Session cache miss");
        let value = fetcher().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }
}
