//! Integration tests for the Redis-backed cache and short-link store
//!
//! These tests require a running Redis instance.
//! Run with: REDIS_URL=redis://localhost:6379 cargo test --test redis_integration_test -- --ignored

use std::sync::Arc;
use std::time::Duration;

use paylink_gateway::cache::{init_cache_pool, Cache, CacheConfig, RedisCache};
use paylink_gateway::shortlink::ShortLinkStore;

async fn setup_cache() -> RedisCache {
    let config = CacheConfig {
        redis_url: std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
        ..Default::default()
    };

    let pool = init_cache_pool(config)
        .await
        .expect("Failed to init cache pool");
    RedisCache::new(pool)
}

#[tokio::test]
#[ignore]
async fn redis_set_get_delete_roundtrip() {
    let cache = setup_cache().await;

    cache
        .set("itest:key", "value", Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(
        cache.get("itest:key").await.unwrap(),
        Some("value".to_string())
    );

    assert!(cache.delete("itest:key").await.unwrap());
    assert_eq!(cache.get("itest:key").await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn redis_entries_expire() {
    let cache = setup_cache().await;

    cache
        .set("itest:expiring", "value", Duration::from_secs(1))
        .await
        .unwrap();
    assert!(cache.get("itest:expiring").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(cache.get("itest:expiring").await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn short_links_survive_process_roundtrip() {
    let cache = Arc::new(setup_cache().await);
    let store = ShortLinkStore::new(cache);

    let put = store
        .put(
            "itest-token",
            "https://checkout.example/itest",
            Duration::from_secs(30),
        )
        .await
        .unwrap();

    let resolved = store.resolve("itest-token").await.unwrap().unwrap();
    assert_eq!(resolved.target_url, "https://checkout.example/itest");
    assert_eq!(resolved.expires_at, put.expires_at);
}
