//! Short-link store
//!
//! Maps an opaque public token to the provider's real checkout URL for a
//! bounded lifetime, so public-facing links survive provider URL churn.
//! Expiry is lazy: the backend TTL makes a resolve after expiry behave as
//! not-found whether or not the entry is physically gone. Writes are loud:
//! losing the commit of a freshly issued link breaks its redirect.

use crate::cache::{keys, Cache};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLink {
    pub target_url: String,
    pub expires_at: DateTime<Utc>,
}

pub struct ShortLinkStore {
    cache: Arc<dyn Cache>,
}

impl ShortLinkStore {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Register `token -> target_url`; overwrite-on-put.
    pub async fn put(
        &self,
        token: &str,
        target_url: &str,
        ttl: Duration,
    ) -> AppResult<StoredLink> {
        let link = StoredLink {
            target_url: target_url.to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(ttl.as_secs() as i64),
        };
        let raw = serde_json::to_string(&link)
            .map_err(|e| AppError::storage(format!("short link encode failed: {e}")))?;
        self.cache
            .set(&keys::paylink(token), &raw, ttl)
            .await
            .map_err(|e| AppError::storage(format!("short link write failed: {e}")))?;
        debug!("Registered short link token={} ttl={}s", token, ttl.as_secs());
        Ok(link)
    }

    /// Resolve a token; expired and unknown tokens are both `None`.
    pub async fn resolve(&self, token: &str) -> AppResult<Option<StoredLink>> {
        let raw = self
            .cache
            .get(&keys::paylink(token))
            .await
            .map_err(|e| AppError::storage(format!("short link read failed: {e}")))?;
        match raw {
            Some(raw) => {
                let link: StoredLink = serde_json::from_str(&raw)
                    .map_err(|e| AppError::storage(format!("short link decode failed: {e}")))?;
                Ok(Some(link))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryCache, UnavailableCache};

    #[tokio::test]
    async fn resolves_within_ttl() {
        let store = ShortLinkStore::new(Arc::new(InMemoryCache::new()));
        store
            .put("tok", "https://provider.example/checkout/1", Duration::from_secs(60))
            .await
            .unwrap();
        let link = store.resolve("tok").await.unwrap().unwrap();
        assert_eq!(link.target_url, "https://provider.example/checkout/1");
    }

    #[tokio::test]
    async fn not_found_after_expiry() {
        let store = ShortLinkStore::new(Arc::new(InMemoryCache::new()));
        store
            .put("tok", "https://provider.example/checkout/1", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.resolve("tok").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_token_is_none() {
        let store = ShortLinkStore::new(Arc::new(InMemoryCache::new()));
        assert_eq!(store.resolve("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_failure_is_loud() {
        let store = ShortLinkStore::new(Arc::new(UnavailableCache));
        let err = store
            .put("tok", "https://provider.example/checkout/1", Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
