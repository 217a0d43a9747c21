//! Redis-backed caching layer for the payment-link gateway

pub mod cache;
pub mod error;
pub mod keys;

pub use cache::{Cache, InMemoryCache, RedisCache, UnavailableCache};
pub use error::{CacheError, CacheResult};

use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use std::time::Duration;
use tracing::{error, info, warn};

pub type RedisPool = Pool<RedisConnectionManager>;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub redis_url: String,
    pub max_connections: u32,
    pub min_idle: u32,
    pub connection_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 20,
            min_idle: 5,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

pub async fn init_cache_pool(config: CacheConfig) -> Result<RedisPool, CacheError> {
    info!(
        "Initializing Redis cache pool: max_connections={}, redis_url={}",
        config.max_connections, config.redis_url
    );

    let manager = RedisConnectionManager::new(config.redis_url.clone()).map_err(|e| {
        error!("Failed to create Redis connection manager: {}", e);
        CacheError::Connection(e.to_string())
    })?;

    let pool = Pool::builder()
        .max_size(config.max_connections)
        .min_idle(Some(config.min_idle))
        .connection_timeout(config.connection_timeout)
        .test_on_check_out(false)
        .build(manager)
        .await
        .map_err(|e| {
            error!("Failed to build Redis connection pool: {}", e);
            CacheError::Connection(e.to_string())
        })?;

    if let Err(e) = test_connection(&pool).await {
        warn!(
            "Initial Redis connection test failed, but continuing: {}",
            e
        );
    }

    info!("Redis cache pool initialized successfully");
    Ok(pool)
}

async fn test_connection(pool: &RedisPool) -> Result<(), CacheError> {
    let mut conn = pool.get().await.map_err(|e| {
        error!("Failed to get Redis connection for test: {}", e);
        CacheError::Connection(e.to_string())
    })?;

    let _: String = redis::cmd("PING")
        .query_async(&mut *conn)
        .await
        .map_err(|e| {
            error!("Redis PING failed: {}", e);
            CacheError::Connection(e.to_string())
        })?;

    Ok(())
}

pub async fn health_check(pool: &RedisPool) -> Result<(), CacheError> {
    test_connection(pool).await
}
