//! Payment provider trait definition
//!
//! Each integrated provider implements this trait to expose a unified
//! interface for issuing checkout links and authenticating status webhooks.

use crate::error::AppResult;
use crate::payments::types::{IssueContext, PaymentEvent, ProviderKind, ProviderLink};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Webhook fields after content-type parsing and lowercase normalization.
pub type NormalizedFields = BTreeMap<String, String>;

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Build, sign and submit a link-creation request.
    ///
    /// The adapter owns the provider-specific signature base string, the
    /// bounded-timeout HTTP call, and checkout-URL extraction (response
    /// header first, then body). A 2xx response without a usable checkout
    /// URL is a protocol error, never a silent fallback.
    async fn create_link(&self, ctx: &IssueContext) -> AppResult<ProviderLink>;

    /// Verify an inbound callback and normalize it into a [`PaymentEvent`].
    ///
    /// Recomputes the expected signature over the schema's field set and
    /// compares in constant time; returns an auth error on mismatch. Only
    /// verified payloads produce events.
    fn verify_webhook(
        &self,
        fields: &NormalizedFields,
        raw: serde_json::Value,
    ) -> AppResult<PaymentEvent>;

    /// Exact plaintext body the provider expects as a success
    /// acknowledgment (suppresses its retry logic).
    fn ack_body(&self) -> &str;
}
