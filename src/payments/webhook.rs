//! Webhook classification and processing
//!
//! Several providers and payload shapes share one HTTP endpoint. Field
//! names are normalized to lowercase first (providers are inconsistent
//! about casing), then an explicit prioritized classifier picks the schema,
//! the matching adapter verifies the signature, and the normalized event is
//! published. Verification failure publishes nothing.

use crate::error::{AppError, AppResult};
use crate::events::EventPublisher;
use crate::payments::traits::{NormalizedFields, PaymentProvider};
use crate::payments::types::{ProviderKind, WebhookSchema};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Classify a normalized payload into a webhook schema.
///
/// Predicates are evaluated in a fixed, documented order:
/// 1. a signature field plus `orderid` ⇒ Freekassa callback;
/// 2. `number` plus any of `paysys`/`amountcurr`/`transid`/`account` ⇒
///    Paymentlnk invoice status.
pub fn classify(fields: &NormalizedFields) -> Option<WebhookSchema> {
    let has = |k: &str| fields.contains_key(k);

    if (has("sign") || has("signature")) && has("orderid") {
        return Some(WebhookSchema::FreekassaCallback);
    }
    if has("number") && (has("paysys") || has("amountcurr") || has("transid") || has("account")) {
        return Some(WebhookSchema::PlnkInvoiceStatus);
    }
    None
}

fn provider_for(schema: WebhookSchema) -> ProviderKind {
    match schema {
        WebhookSchema::FreekassaCallback => ProviderKind::Freekassa,
        WebhookSchema::PlnkInvoiceStatus => ProviderKind::Paymentlnk,
    }
}

/// Lowercase field names; scalar JSON values become their string forms,
/// nested values are skipped (no provider nests signed fields).
pub fn normalize_json(value: &serde_json::Value) -> NormalizedFields {
    let mut fields = NormalizedFields::new();
    if let Some(map) = value.as_object() {
        for (key, val) in map {
            let text = match val {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            fields.insert(key.to_lowercase(), text);
        }
    }
    fields
}

pub fn normalize_form(pairs: Vec<(String, String)>) -> NormalizedFields {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect()
}

pub struct WebhookProcessor {
    providers: HashMap<ProviderKind, Arc<dyn PaymentProvider>>,
    publisher: Arc<dyn EventPublisher>,
}

impl WebhookProcessor {
    pub fn new(
        providers: Vec<Arc<dyn PaymentProvider>>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.kind(), p)).collect(),
            publisher,
        }
    }

    /// Verify one inbound callback and publish its event.
    ///
    /// Returns the provider-mandated plaintext acknowledgment. A publish
    /// failure is reported in the logs but does not withhold the ack: the
    /// provider is not guaranteed to redeliver, and the event is already
    /// verified.
    pub async fn process(
        &self,
        fields: &NormalizedFields,
        raw: serde_json::Value,
    ) -> AppResult<String> {
        let schema = classify(fields)
            .ok_or_else(|| AppError::validation("unrecognized webhook payload"))?;
        let kind = provider_for(schema);
        let provider = self.providers.get(&kind).ok_or_else(|| {
            AppError::configuration(format!("provider {kind} is not configured"))
        })?;

        let event = provider.verify_webhook(fields, raw)?;
        info!(
            "Verified webhook provider={} schema={:?} order_id={} status={:?} key={}",
            event.provider, event.schema, event.order_id, event.status, event.event_key
        );

        if let Err(e) = self.publisher.publish(&event).await {
            error!(
                "Failed to publish payment event key={}: {}",
                event.event_key, e
            );
        }

        Ok(provider.ack_body().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_of(pairs: &[(&str, &str)]) -> NormalizedFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn classifies_freekassa_by_signature_and_order_id() {
        let fields = fields_of(&[("orderid", "1"), ("sign", "abc"), ("amount", "10.00")]);
        assert_eq!(classify(&fields), Some(WebhookSchema::FreekassaCallback));
    }

    #[test]
    fn classifies_paymentlnk_by_number_and_account() {
        let fields = fields_of(&[
            ("number", "order-1"),
            ("account", "acc"),
            ("signature", "abc"),
        ]);
        assert_eq!(classify(&fields), Some(WebhookSchema::PlnkInvoiceStatus));
    }

    #[test]
    fn freekassa_wins_when_both_shapes_could_match() {
        // orderid + signature takes priority over number-based dispatch
        let fields = fields_of(&[
            ("orderid", "1"),
            ("signature", "abc"),
            ("number", "order-1"),
            ("amountcurr", "RUB"),
        ]);
        assert_eq!(classify(&fields), Some(WebhookSchema::FreekassaCallback));
    }

    #[test]
    fn unknown_payload_is_unclassified() {
        let fields = fields_of(&[("hello", "world")]);
        assert_eq!(classify(&fields), None);
    }

    #[test]
    fn json_normalization_lowercases_and_stringifies() {
        let value = serde_json::json!({
            "orderId": "5",
            "AMOUNT": 100.5,
            "ok": true,
            "nested": {"skipped": 1},
        });
        let fields = normalize_json(&value);
        assert_eq!(fields.get("orderid").map(String::as_str), Some("5"));
        assert_eq!(fields.get("amount").map(String::as_str), Some("100.5"));
        assert_eq!(fields.get("ok").map(String::as_str), Some("true"));
        assert!(!fields.contains_key("nested"));
    }

    #[test]
    fn form_normalization_lowercases_keys() {
        let fields = normalize_form(vec![
            ("transID".to_string(), "9".to_string()),
            ("Number".to_string(), "order-1".to_string()),
        ]);
        assert_eq!(fields.get("transid").map(String::as_str), Some("9"));
        assert_eq!(fields.get("number").map(String::as_str), Some("order-1"));
    }
}
