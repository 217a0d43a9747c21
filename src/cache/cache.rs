//! Cache trait with Redis and in-memory implementations
//!
//! Both the idempotency cache and the short-link store sit on this
//! interface. Backend errors are surfaced to the caller: the idempotency
//! layer treats them as a miss (fail-open), while the short-link commit of
//! a successful issuance fails loudly, because losing that write breaks the
//! public redirect.

use super::error::{CacheError, CacheResult};
use super::RedisPool;
use async_trait::async_trait;
use bb8::PooledConnection;
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

type RedisConnection<'a> = PooledConnection<'a, RedisConnectionManager>;

/// String-valued cache with per-key TTL.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get the value for a key; expired or absent keys are a miss.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Set a value with a TTL; last write wins.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Delete a key, returning whether it existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;
}

/// Redis implementation over a bb8 pool.
pub struct RedisCache {
    pool: RedisPool,
}

impl RedisCache {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> CacheResult<RedisConnection<'_>> {
        self.pool.get().await.map_err(|e| {
            warn!("Failed to get Redis connection: {}", e);
            e.into()
        })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection().await?;
        let result: Option<String> = conn.get(key).await.map_err(|e| {
            warn!("Redis GET failed for key '{}': {}", key, e);
            e
        })?;
        match &result {
            Some(_) => debug!("Cache hit for key: {}", key),
            None => debug!("Cache miss for key: {}", key),
        }
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection().await?;
        let ttl_seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, ttl_seconds).await.map_err(|e| {
            warn!("Redis SET_EX failed for key '{}': {}", key, e);
            e
        })?;
        debug!("Cache set for key: {} (ttl: {}s)", key, ttl_seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection().await?;
        let result: i32 = conn.del(key).await.map_err(|e| {
            warn!("Redis DEL failed for key '{}': {}", key, e);
            e
        })?;
        Ok(result > 0)
    }
}

/// In-process map implementation.
///
/// Default for tests and single-instance deployments only: entries are not
/// visible to other worker processes, so horizontal scaling requires the
/// Redis backend. Expiry is lazy on read, with opportunistic purging of
/// expired entries on every write.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        // amortized GC
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

/// Cache that fails every operation; exercises fail-open paths in tests.
pub struct UnavailableCache;

#[async_trait]
impl Cache for UnavailableCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Err(CacheError::Connection("backend down".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Connection("backend down".to_string()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Err(CacheError::Connection("backend down".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_set_get_delete() {
        let cache = InMemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        assert!(cache.delete("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn in_memory_expiry_is_lazy() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v", Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn in_memory_last_write_wins() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "first", Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("k", "second", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("second".to_string()));
    }
}
