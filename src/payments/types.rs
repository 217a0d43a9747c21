//! Gateway domain types
//!
//! Common request/response/event shapes shared by the orchestrator, the
//! provider adapters and the webhook pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integrated payment providers. Hashable: provider registries key on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Freekassa,
    Paymentlnk,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Freekassa => write!(f, "freekassa"),
            ProviderKind::Paymentlnk => write!(f, "paymentlnk"),
        }
    }
}

/// Distinct webhook shapes; several can share the one HTTP endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookSchema {
    FreekassaCallback,
    PlnkInvoiceStatus,
}

/// Normalized payment status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentEventStatus {
    Success,
    Failed,
    Pending,
    Unknown,
}

/// Body of `POST /internal/create_link`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLinkRequest {
    pub amount: f64,
    pub provider: ProviderKind,
    /// Provider-specific payment method code (Freekassa: 36 cards, 44 SBP).
    #[serde(default)]
    pub method: Option<u32>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Caller's order number; generated when absent.
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub ttl_minutes: Option<i64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub cf1: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
}

/// Validated, amount-formatted input handed to a provider adapter.
#[derive(Debug, Clone)]
pub struct IssueContext {
    /// Exactly the two-decimal string that is signed and sent.
    pub amount: String,
    pub method: Option<u32>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub payment_id: String,
    pub ttl_minutes: i64,
    pub first_name: Option<String>,
    pub cf1: Option<String>,
    pub ip: String,
}

/// What a provider adapter returns after a successful create call.
#[derive(Debug, Clone)]
pub struct ProviderLink {
    pub payment_id: String,
    pub checkout_url: String,
    pub trans_id: Option<String>,
}

/// The issued link as returned to the internal caller. Idempotency replays
/// this payload verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedLink {
    pub public_url: String,
    pub token: String,
    #[serde(rename = "provider_payment_id")]
    pub payment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_id: Option<String>,
    #[serde(rename = "provider_checkout_url")]
    pub provider_url: String,
    pub expires_at: DateTime<Utc>,
    pub provider: ProviderKind,
}

/// Normalized event published for every verified webhook.
///
/// Constructed only after signature verification; consumers dedup on
/// `event_key` because delivery is at-least-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub provider: ProviderKind,
    pub schema: WebhookSchema,
    pub order_id: String,
    pub amount: String,
    pub currency: String,
    pub status: PaymentEventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_id: Option<String>,
    pub event_key: String,
    pub raw: serde_json::Value,
}

impl PaymentEvent {
    /// Stable dedup key: provider transaction id when present, otherwise
    /// order id + amount.
    pub fn event_key(
        provider: ProviderKind,
        trans_id: Option<&str>,
        order_id: &str,
        amount: &str,
    ) -> String {
        match trans_id.filter(|t| !t.trim().is_empty()) {
            Some(tid) => format!("{provider}:{tid}"),
            None => format!("{provider}:{order_id}:{amount}"),
        }
    }
}

/// Canonical two-decimal amount string, rounded to cents.
///
/// The one producer of the amount text used in signature base strings and
/// provider payloads; a divergence between the two breaks every provider's
/// signature check.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount * 100.0).round();
    format!("{:.2}", cents / 100.0)
}
