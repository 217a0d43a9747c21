//! Freekassa payment provider
//!
//! Link creation goes through the v1 orders API (Bearer-authenticated JSON
//! with a sorted-values HMAC request signature); status callbacks carry a
//! colon-delimited HMAC-SHA256 signature over order id, amount and currency
//! with the merchant secret both appended and used as the key.

use crate::error::{AppError, AppResult};
use crate::payments::traits::{NormalizedFields, PaymentProvider};
use crate::payments::types::{
    IssueContext, PaymentEvent, PaymentEventStatus, ProviderKind, ProviderLink, WebhookSchema,
};
use crate::signature;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info};

const PROVIDER: &str = "freekassa";

/// Freekassa provider configuration
#[derive(Debug, Clone)]
pub struct FreekassaConfig {
    pub merchant_id: u64,
    /// API key: Bearer credential and HMAC key for outbound signatures.
    pub api_key: String,
    /// Merchant secret used for webhook signatures.
    pub secret_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub currency: String,
    /// Plaintext body the provider expects back on a handled callback.
    pub ack_body: String,
}

impl FreekassaConfig {
    /// Read configuration from the environment.
    ///
    /// Returns `Ok(None)` when no `FREEKASSA_*` variable is set (provider
    /// disabled); partial configuration is a fatal error.
    pub fn from_env() -> AppResult<Option<Self>> {
        let merchant_id = std::env::var("FREEKASSA_MERCHANT_ID").ok();
        let api_key = std::env::var("FREEKASSA_API_KEY").ok();
        let secret_key = std::env::var("FREEKASSA_SECRET_KEY").ok();

        if merchant_id.is_none() && api_key.is_none() && secret_key.is_none() {
            return Ok(None);
        }

        let (merchant_id, api_key, secret_key) = match (merchant_id, api_key, secret_key) {
            (Some(m), Some(a), Some(s)) => (m, a, s),
            _ => {
                return Err(AppError::configuration(
                    "FREEKASSA_MERCHANT_ID, FREEKASSA_API_KEY and FREEKASSA_SECRET_KEY \
                     must all be set to enable Freekassa",
                ))
            }
        };

        let merchant_id = merchant_id.parse().map_err(|_| {
            AppError::configuration("FREEKASSA_MERCHANT_ID must be a valid number")
        })?;

        Ok(Some(Self {
            merchant_id,
            api_key,
            secret_key,
            base_url: std::env::var("FREEKASSA_BASE_URL")
                .unwrap_or_else(|_| "https://api.fk.life/v1".to_string()),
            timeout_secs: std::env::var("FREEKASSA_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15),
            currency: std::env::var("FREEKASSA_CURRENCY")
                .unwrap_or_else(|_| "RUB".to_string()),
            ack_body: std::env::var("FREEKASSA_ACK_BODY").unwrap_or_else(|_| "OK".to_string()),
        }))
    }
}

pub struct FreekassaProvider {
    config: FreekassaConfig,
    client: Client,
}

impl FreekassaProvider {
    pub fn new(config: FreekassaConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    /// Sorted key/value request signature: parameter values ordered by key
    /// name, pipe-joined, HMAC-SHA256 with the API key.
    fn order_signature(&self, params: &BTreeMap<String, String>) -> String {
        signature::sorted_values_hmac_sha256(params, '|', self.config.api_key.as_bytes())
    }

    /// Callback signature: `orderId:amount:currency:secret`, HMAC'd with
    /// the same secret.
    fn callback_signature(&self, order_id: &str, amount: &str, currency: &str) -> String {
        let base = format!(
            "{order_id}:{amount}:{currency}:{}",
            self.config.secret_key
        );
        signature::hmac_sha256_hex(self.config.secret_key.as_bytes(), base.as_bytes())
    }

    /// Successful callbacks carry `paid` (orders API) or no status field at
    /// all (legacy notifications, mapped to `Unknown`); order polling also
    /// returns `wait`/`cancel`. The extra synonyms normalize casing drift
    /// between the two API generations; anything else stays `Unknown`.
    fn normalize_status(status: &str) -> PaymentEventStatus {
        match status.to_lowercase().as_str() {
            "paid" | "success" | "completed" => PaymentEventStatus::Success,
            "fail" | "failed" | "error" | "cancel" => PaymentEventStatus::Failed,
            "wait" | "pending" => PaymentEventStatus::Pending,
            _ => PaymentEventStatus::Unknown,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FreekassaOrderResponse {
    #[serde(default)]
    location: Option<String>,
    #[serde(default, rename = "orderId")]
    order_id: Option<i64>,
}

#[async_trait]
impl PaymentProvider for FreekassaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Freekassa
    }

    async fn create_link(&self, ctx: &IssueContext) -> AppResult<ProviderLink> {
        let email = ctx.email.as_deref().ok_or_else(|| {
            AppError::validation("email is required for freekassa payments")
        })?;

        info!(
            "Creating Freekassa order: {} {} {}",
            ctx.amount, self.config.currency, ctx.payment_id
        );

        let nonce = chrono::Utc::now().timestamp_millis().to_string();
        let method = ctx.method.unwrap_or(36);

        // The signature covers exactly the values that go on the wire.
        let mut params = BTreeMap::new();
        params.insert("shopId".to_string(), self.config.merchant_id.to_string());
        params.insert("nonce".to_string(), nonce.clone());
        params.insert("amount".to_string(), ctx.amount.clone());
        params.insert("currency".to_string(), self.config.currency.clone());
        params.insert("paymentId".to_string(), ctx.payment_id.clone());
        params.insert("i".to_string(), method.to_string());
        params.insert("email".to_string(), email.to_string());
        params.insert("ip".to_string(), ctx.ip.clone());
        let sig = self.order_signature(&params);

        let mut payload = serde_json::json!({
            "shopId": self.config.merchant_id,
            "nonce": nonce,
            "amount": ctx.amount,
            "currency": self.config.currency,
            "paymentId": ctx.payment_id,
            "i": method,
            "email": email,
            "ip": ctx.ip,
            "signature": sig,
        });
        if let Some(description) = ctx.description.as_deref().filter(|d| !d.is_empty()) {
            payload["description"] = serde_json::Value::String(description.to_string());
        }

        let url = format!("{}/orders", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("Freekassa request error: {}", e);
                AppError::upstream_unavailable(PROVIDER, e.to_string())
            })?;

        let status = response.status();
        let location_header = response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!("Freekassa error: code={} body={}", status, super::body_snippet(&body));
            return Err(AppError::upstream_unavailable(
                PROVIDER,
                format!("HTTP {status}"),
            ));
        }

        // Checkout URL priority: Location header, then body `location`.
        let parsed: Option<FreekassaOrderResponse> = serde_json::from_str(&body).ok();
        let checkout_url = location_header
            .or_else(|| parsed.as_ref().and_then(|p| p.location.clone()))
            .ok_or_else(|| {
                error!(
                    "Freekassa response without pay link: code={} body={}",
                    status,
                    super::body_snippet(&body)
                );
                AppError::upstream_protocol(PROVIDER, "response without pay link")
            })?;

        info!(
            "Freekassa order created: payment_id={} url={}",
            ctx.payment_id, checkout_url
        );

        Ok(ProviderLink {
            payment_id: ctx.payment_id.clone(),
            checkout_url,
            trans_id: parsed.and_then(|p| p.order_id).map(|id| id.to_string()),
        })
    }

    fn verify_webhook(
        &self,
        fields: &NormalizedFields,
        raw: serde_json::Value,
    ) -> AppResult<PaymentEvent> {
        let order_id = fields
            .get("orderid")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::validation("callback missing orderId"))?;
        let amount = fields
            .get("amount")
            .ok_or_else(|| AppError::validation("callback missing amount"))?;
        let currency = fields
            .get("currency")
            .ok_or_else(|| AppError::validation("callback missing currency"))?;
        let candidate = fields
            .get("sign")
            .or_else(|| fields.get("signature"))
            .ok_or_else(|| AppError::auth("callback missing signature"))?;

        let expected = self.callback_signature(order_id, amount, currency);
        if !signature::verify_hex(candidate, &expected) {
            return Err(AppError::auth("invalid callback signature"));
        }

        let status = fields
            .get("status")
            .map(|s| Self::normalize_status(s))
            .unwrap_or(PaymentEventStatus::Unknown);
        let trans_id = fields
            .get("intid")
            .filter(|v| !v.trim().is_empty())
            .cloned();

        let event_key = PaymentEvent::event_key(
            ProviderKind::Freekassa,
            trans_id.as_deref(),
            order_id,
            amount,
        );

        Ok(PaymentEvent {
            provider: ProviderKind::Freekassa,
            schema: WebhookSchema::FreekassaCallback,
            order_id: order_id.clone(),
            amount: amount.clone(),
            currency: currency.clone(),
            status,
            trans_id,
            event_key,
            raw,
        })
    }

    fn ack_body(&self) -> &str {
        &self.config.ack_body
    }
}
