//! Idempotency cache
//!
//! Makes "create link" safe to retry: the first successful issuance for a
//! caller-supplied key stores its response, and every later call with the
//! same key within the TTL replays that payload verbatim without touching
//! the provider. Reads fail open: an unreachable backend degrades to a
//! miss so issuance is never blocked by the cache.

use crate::cache::{keys, Cache};
use crate::payments::types::CreatedLink;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct IdempotencyCache {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl IdempotencyCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Look up a cached response. Backend errors and undecodable records
    /// are treated as a miss.
    pub async fn get(&self, key: &str) -> Option<CreatedLink> {
        let raw = match self.cache.get(&keys::idempotency(key)).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Idempotency lookup failed for key={}, treating as miss: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str::<CreatedLink>(&raw) {
            Ok(link) => {
                info!(
                    "Idempotent hit key={} payment_id={}",
                    key, link.payment_id
                );
                Some(link)
            }
            Err(e) => {
                warn!("Discarding undecodable idempotency record key={}: {}", key, e);
                None
            }
        }
    }

    /// Store a response for a key; last write wins. A failed write is
    /// logged but not surfaced, the response has already been produced.
    pub async fn set(&self, key: &str, link: &CreatedLink) {
        let raw = match serde_json::to_string(link) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize idempotency record key={}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.cache.set(&keys::idempotency(key), &raw, self.ttl).await {
            warn!("Failed to store idempotency record key={}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryCache, UnavailableCache};
    use crate::payments::types::ProviderKind;
    use chrono::Utc;

    fn sample_link() -> CreatedLink {
        CreatedLink {
            public_url: "https://pay.example.com/pay/tok".to_string(),
            token: "tok".to_string(),
            payment_id: "order-1".to_string(),
            trans_id: Some("42".to_string()),
            provider_url: "https://provider.example/checkout/42".to_string(),
            expires_at: Utc::now(),
            provider: ProviderKind::Freekassa,
        }
    }

    #[tokio::test]
    async fn replays_stored_response() {
        let idem = IdempotencyCache::new(
            Arc::new(InMemoryCache::new()),
            Duration::from_secs(60),
        );
        let link = sample_link();
        idem.set("key-1", &link).await;
        assert_eq!(idem.get("key-1").await, Some(link));
    }

    #[tokio::test]
    async fn backend_failure_is_a_miss() {
        let idem = IdempotencyCache::new(Arc::new(UnavailableCache), Duration::from_secs(60));
        idem.set("key-1", &sample_link()).await; // swallowed
        assert_eq!(idem.get("key-1").await, None);
    }

    #[tokio::test]
    async fn expired_record_is_a_miss() {
        let idem = IdempotencyCache::new(
            Arc::new(InMemoryCache::new()),
            Duration::from_millis(20),
        );
        idem.set("key-1", &sample_link()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(idem.get("key-1").await, None);
    }
}
