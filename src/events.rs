//! Payment event publishing
//!
//! One normalized event is pushed onto an external channel per verified
//! webhook. Delivery is at-least-once; consumers dedup on the event key.
//! The publish result is surfaced to the caller so failures can be logged
//! and counted, but the webhook acknowledgment to the provider does not
//! depend on it; the provider will not necessarily retry.

use crate::error::{AppError, AppResult};
use crate::payments::types::PaymentEvent;
use crate::cache::RedisPool;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &PaymentEvent) -> AppResult<()>;
}

/// Publishes events onto a Redis Stream (`XADD <stream> * payload <json>`).
pub struct RedisStreamPublisher {
    pool: RedisPool,
    stream: String,
}

impl RedisStreamPublisher {
    pub fn new(pool: RedisPool, stream: String) -> Self {
        Self { pool, stream }
    }
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(&self, event: &PaymentEvent) -> AppResult<()> {
        let payload = serde_json::to_string(event)
            .map_err(|e| AppError::storage(format!("event encode failed: {e}")))?;

        let mut conn = self.pool.get().await.map_err(|e| {
            warn!("Failed to get Redis connection for publish: {}", e);
            AppError::storage(format!("event channel unavailable: {e}"))
        })?;

        let _: String = redis::cmd("XADD")
            .arg(&self.stream)
            .arg("*")
            .arg("payload")
            .arg(&payload)
            .query_async(&mut *conn)
            .await
            .map_err(|e| {
                warn!("XADD to stream '{}' failed: {}", self.stream, e);
                AppError::storage(format!("event publish failed: {e}"))
            })?;

        debug!(
            "Published event key={} to stream={}",
            event.event_key, self.stream
        );
        Ok(())
    }
}

/// Collects events in memory; used by tests and as a wiring default before
/// the Redis pool exists.
#[derive(Default)]
pub struct InMemoryPublisher {
    pub events: Mutex<Vec<PaymentEvent>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn take(&self) -> Vec<PaymentEvent> {
        std::mem::take(&mut *self.events.lock().await)
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, event: &PaymentEvent) -> AppResult<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Publisher that always fails; exercises the ack-despite-publish-failure
/// path in tests.
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _event: &PaymentEvent) -> AppResult<()> {
        Err(AppError::storage("event channel down"))
    }
}
