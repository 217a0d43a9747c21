//! Paymentlnk payment provider
//!
//! Two creation modes against the same merchant account:
//! - invoice (doc 4.12): form POST answered with JSON carrying `payURL` and
//!   `transID`; MD5-uppercase signature over a colon-delimited base string
//!   with conditional field groups (customer fields, email/phone pairs).
//! - start (doc 4.1.1): form POST answered with a redirect; the checkout
//!   URL comes from the `Location` header, falling back to the first
//!   provider URL found in the body. Signature is MD5 or HMAC-SHA256 keyed
//!   with both secrets, per configuration.
//!
//! Status callbacks are form-encoded; the account must match and the
//! documented MD5 signature must verify before an event is produced.

use crate::error::{AppError, AppResult};
use crate::payments::traits::{NormalizedFields, PaymentProvider};
use crate::payments::types::{
    IssueContext, PaymentEvent, PaymentEventStatus, ProviderKind, ProviderLink, WebhookSchema,
};
use crate::signature::{self, FieldGroup};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

const PROVIDER: &str = "paymentlnk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlnkHashAlg {
    Md5,
    Sha256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlnkCreateMode {
    Invoice,
    Start,
}

/// Paymentlnk provider configuration
#[derive(Debug, Clone)]
pub struct PaymentlnkConfig {
    pub account: String,
    pub secret1: String,
    pub secret2: String,
    /// Payment system selector sent as `paysys` (invoice) / `currency` (start).
    pub paysys: String,
    pub amountcurr: String,
    /// Digest for the start-mode signature; invoice mode is always MD5.
    pub hash_alg: PlnkHashAlg,
    pub mode: PlnkCreateMode,
    pub base_url: String,
    pub back_url: Option<String>,
    pub timeout_secs: u64,
    pub ack_body: String,
}

impl PaymentlnkConfig {
    /// Read configuration from the environment.
    ///
    /// Returns `Ok(None)` when no `PLNK_*` credential is set (provider
    /// disabled); partial configuration is a fatal error.
    pub fn from_env() -> AppResult<Option<Self>> {
        let account = std::env::var("PLNK_ACCOUNT").ok();
        let secret1 = std::env::var("PLNK_SECRET1").ok();
        let secret2 = std::env::var("PLNK_SECRET2").ok();

        if account.is_none() && secret1.is_none() && secret2.is_none() {
            return Ok(None);
        }

        let (account, secret1, secret2) = match (account, secret1, secret2) {
            (Some(a), Some(s1), Some(s2)) => (a, s1, s2),
            _ => {
                return Err(AppError::configuration(
                    "PLNK_ACCOUNT, PLNK_SECRET1 and PLNK_SECRET2 must all be set \
                     to enable Paymentlnk",
                ))
            }
        };

        let hash_alg = match std::env::var("PLNK_HASH_ALG")
            .unwrap_or_else(|_| "md5".to_string())
            .to_lowercase()
            .as_str()
        {
            "md5" => PlnkHashAlg::Md5,
            "sha256" => PlnkHashAlg::Sha256,
            other => {
                return Err(AppError::configuration(format!(
                    "PLNK_HASH_ALG must be 'md5' or 'sha256', got '{other}'"
                )))
            }
        };

        let mode = match std::env::var("PLNK_MODE")
            .unwrap_or_else(|_| "invoice".to_string())
            .to_lowercase()
            .as_str()
        {
            "invoice" => PlnkCreateMode::Invoice,
            "start" => PlnkCreateMode::Start,
            other => {
                return Err(AppError::configuration(format!(
                    "PLNK_MODE must be 'invoice' or 'start', got '{other}'"
                )))
            }
        };

        Ok(Some(Self {
            account,
            secret1,
            secret2,
            paysys: std::env::var("PLNK_PAYSYS")
                .unwrap_or_else(|_| "EXT".to_string())
                .to_uppercase(),
            amountcurr: std::env::var("PLNK_AMOUNTCURR")
                .unwrap_or_else(|_| "RUB".to_string())
                .to_uppercase(),
            hash_alg,
            mode,
            base_url: std::env::var("PLNK_BASE_URL")
                .unwrap_or_else(|_| "https://start.paymentlnk.com/api/".to_string()),
            back_url: std::env::var("PLNK_BACKURL").ok().filter(|u| !u.is_empty()),
            timeout_secs: std::env::var("PLNK_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            ack_body: std::env::var("PLNK_ACK_BODY").unwrap_or_else(|_| "OK".to_string()),
        }))
    }
}

/// Field values for one invoice signature, already wire-formatted.
struct InvoiceSignatureContext<'a> {
    amount: &'a str,
    number: &'a str,
    /// URL-encoded, min-length-padded description.
    description: &'a str,
    validity: &'a str,
    first_name: &'a str,
    cf1: Option<&'a str>,
    cf2: Option<&'a str>,
    cf3: Option<&'a str>,
    email: Option<&'a str>,
    notify_email: Option<&'a str>,
    phone: Option<&'a str>,
    notify_phone: Option<&'a str>,
}

pub struct PaymentlnkProvider {
    config: PaymentlnkConfig,
    client: Client,
    body_url: Regex,
}

impl PaymentlnkProvider {
    pub fn new(config: PaymentlnkConfig) -> Self {
        // Redirects are not followed: the Location header is the payload.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        let origin = origin_of(&config.base_url);
        let body_url = Regex::new(&format!(r#"{}[^\s"']+"#, regex::escape(&origin)))
            .expect("origin regex is valid");

        Self {
            config,
            client,
            body_url,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Invoice (4.12) base string. Canonical order:
    /// amount:amountcurr:paysys:number:description:validity:first_name:
    /// last_name:middle_name[:cf1:cf2:cf3][:email:notify_email]
    /// [:phone:notify_phone][:backURL]:account:secret1:secret2
    fn invoice_base(&self, ctx: &InvoiceSignatureContext<'_>) -> String {
        let groups = [
            FieldGroup::always(&[
                Some(ctx.amount),
                Some(self.config.amountcurr.as_str()),
                Some(self.config.paysys.as_str()),
                Some(ctx.number),
                Some(ctx.description),
                Some(ctx.validity),
                Some(ctx.first_name),
                None, // last_name: blank slot, never sent in the payload
                None, // middle_name
            ]),
            FieldGroup::if_any_present(&[ctx.cf1, ctx.cf2, ctx.cf3]),
            FieldGroup::if_leader_present(&[ctx.email, ctx.notify_email]),
            FieldGroup::if_leader_present(&[ctx.phone, ctx.notify_phone]),
            FieldGroup::if_any_present(&[self.config.back_url.as_deref()]),
            FieldGroup::always(&[
                Some(self.config.account.as_str()),
                Some(self.config.secret1.as_str()),
                Some(self.config.secret2.as_str()),
            ]),
        ];
        signature::base_string(&groups, ':')
    }

    fn invoice_signature(&self, ctx: &InvoiceSignatureContext<'_>) -> String {
        signature::md5_hex_upper(&self.invoice_base(ctx))
    }

    /// Start (4.1.1) base string:
    /// amount:amountcurr:currency:number:description:trtype:account
    /// [:paytoken][:backURL][:cf1:cf2:cf3]:secret1:secret2
    fn start_base(&self, amount: &str, number: &str, description: &str, cf1: Option<&str>) -> String {
        let groups = [
            FieldGroup::always(&[
                Some(amount),
                Some(self.config.amountcurr.as_str()),
                Some(self.config.paysys.as_str()),
                Some(number),
                Some(description),
                Some("1"), // trtype
                Some(self.config.account.as_str()),
            ]),
            FieldGroup::if_any_present(&[self.config.back_url.as_deref()]),
            FieldGroup::if_any_present(&[cf1, None, None]),
            FieldGroup::always(&[
                Some(self.config.secret1.as_str()),
                Some(self.config.secret2.as_str()),
            ]),
        ];
        signature::base_string(&groups, ':')
    }

    fn start_signature(&self, base: &str) -> String {
        match self.config.hash_alg {
            PlnkHashAlg::Md5 => signature::md5_hex_lower(base),
            PlnkHashAlg::Sha256 => {
                let key = format!("{}{}", self.config.secret1, self.config.secret2);
                signature::hmac_sha256_hex(key.as_bytes(), base.as_bytes())
            }
        }
    }

    /// Status-callback signature:
    /// amount:amountcurr:number:status:account:secret1:secret2, MD5 upper.
    /// Computed over the received `amountcurr`, so the currency carried by
    /// the callback is itself covered by the verification.
    fn status_signature(&self, amount: &str, amountcurr: &str, number: &str, status: &str) -> String {
        let groups = [FieldGroup::always(&[
            Some(amount),
            Some(amountcurr),
            Some(number),
            Some(status),
            Some(self.config.account.as_str()),
            Some(self.config.secret1.as_str()),
            Some(self.config.secret2.as_str()),
        ])];
        signature::md5_hex_upper(&signature::base_string(&groups, ':'))
    }

    /// Provider rule: description is minimum 6 characters (space-padded)
    /// and URL-encoded. The encoded string is what gets signed and sent.
    fn prepare_description(raw: &str) -> String {
        let mut desc = raw.to_string();
        if desc.chars().count() < 6 {
            desc = format!("{desc:<6}");
        }
        urlencoding::encode(&desc).into_owned()
    }

    fn validity_string(ttl_minutes: i64) -> String {
        let dt = chrono::Utc::now() + chrono::Duration::minutes(ttl_minutes);
        dt.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
    }

    fn normalize_status(status: &str) -> PaymentEventStatus {
        match status.to_lowercase().as_str() {
            "ok" | "success" | "paid" => PaymentEventStatus::Success,
            "error" | "fail" | "failed" => PaymentEventStatus::Failed,
            "wait" | "pending" => PaymentEventStatus::Pending,
            _ => PaymentEventStatus::Unknown,
        }
    }

    async fn create_invoice(&self, ctx: &IssueContext) -> AppResult<ProviderLink> {
        let description = Self::prepare_description(
            ctx.description.as_deref().filter(|d| !d.trim().is_empty()).unwrap_or(&format!(
                "Payment {} {} {}",
                ctx.payment_id, ctx.amount, self.config.amountcurr
            )),
        );
        let validity = Self::validity_string(ctx.ttl_minutes);
        let first_name = ctx.first_name.as_deref().unwrap_or("Client").to_string();
        let email = ctx.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
        let phone = ctx.phone.as_deref().map(str::trim).filter(|p| !p.is_empty());
        let notify_email = email.map(|_| "1");
        let notify_phone = phone.map(|_| "1");
        let cf1 = ctx
            .cf1
            .clone()
            .unwrap_or_else(|| format!("userid:{}", uuid::Uuid::new_v4().simple()));

        let sig = self.invoice_signature(&InvoiceSignatureContext {
            amount: &ctx.amount,
            number: &ctx.payment_id,
            description: &description,
            validity: &validity,
            first_name: &first_name,
            cf1: Some(&cf1),
            cf2: None,
            cf3: None,
            email,
            notify_email,
            phone,
            notify_phone,
        });

        let mut form: Vec<(&str, String)> = vec![
            ("amount", ctx.amount.clone()),
            ("amountcurr", self.config.amountcurr.clone()),
            ("paysys", self.config.paysys.clone()),
            ("number", ctx.payment_id.clone()),
            ("description", description),
            ("account", self.config.account.clone()),
            ("signature", sig),
            ("validity", validity),
            ("first_name", first_name),
            ("cf1", cf1),
        ];
        if let Some(email) = email {
            form.push(("email", email.to_string()));
            form.push(("notify_email", "1".to_string()));
        }
        if let Some(phone) = phone {
            form.push(("phone", phone.to_string()));
            form.push(("notify_phone", "1".to_string()));
        }
        if let Some(back_url) = &self.config.back_url {
            form.push(("backURL", back_url.clone()));
        }

        let response = self
            .client
            .post(self.endpoint("/payment/invoice"))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("Paymentlnk invoice request error: {}", e);
                AppError::upstream_unavailable(PROVIDER, e.to_string())
            })?;

        let http_status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !http_status.is_success() {
            error!(
                "Paymentlnk invoice error: code={} body={}",
                http_status,
                super::body_snippet(&body)
            );
            return Err(AppError::upstream_unavailable(
                PROVIDER,
                format!("HTTP {http_status}"),
            ));
        }

        let data: PlnkInvoiceResponse = serde_json::from_str(&body).map_err(|_| {
            error!(
                "Paymentlnk invalid response: code={} body={}",
                http_status,
                super::body_snippet(&body)
            );
            AppError::upstream_protocol(PROVIDER, "invalid response body")
        })?;

        if !data.status.eq_ignore_ascii_case("wait") {
            error!("Paymentlnk invoice rejected: {}", body);
            return Err(AppError::upstream_protocol(
                PROVIDER,
                format!(
                    "invoice rejected: {} {}",
                    data.errorcode.unwrap_or_default(),
                    data.errortext.unwrap_or_default()
                ),
            ));
        }

        let checkout_url = data.pay_url.filter(|u| !u.is_empty()).ok_or_else(|| {
            error!("Paymentlnk response without payURL: {}", body);
            AppError::upstream_protocol(PROVIDER, "response without payURL")
        })?;

        info!(
            "Paymentlnk invoice created: number={} trans_id={:?}",
            ctx.payment_id, data.trans_id
        );

        Ok(ProviderLink {
            payment_id: ctx.payment_id.clone(),
            checkout_url,
            trans_id: data.trans_id.filter(|t| !t.is_empty()),
        })
    }

    async fn create_start(&self, ctx: &IssueContext) -> AppResult<ProviderLink> {
        let description = Self::prepare_description(
            ctx.description.as_deref().filter(|d| !d.trim().is_empty()).unwrap_or(&format!(
                "Payment {} {} {}",
                ctx.payment_id, ctx.amount, self.config.amountcurr
            )),
        );

        let base = self.start_base(&ctx.amount, &ctx.payment_id, &description, ctx.cf1.as_deref());
        let sig = self.start_signature(&base);

        let mut form: Vec<(&str, String)> = vec![
            ("account", self.config.account.clone()),
            ("amount", ctx.amount.clone()),
            ("amountcurr", self.config.amountcurr.clone()),
            ("currency", self.config.paysys.clone()),
            ("number", ctx.payment_id.clone()),
            ("description", description),
            ("trtype", "1".to_string()),
            ("signature", sig),
        ];
        if let Some(cf1) = &ctx.cf1 {
            form.push(("cf1", cf1.clone()));
        }
        if let Some(back_url) = &self.config.back_url {
            form.push(("backURL", back_url.clone()));
        }

        let response = self
            .client
            .post(self.endpoint("/payment/start"))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("Paymentlnk start request error: {}", e);
                AppError::upstream_unavailable(PROVIDER, e.to_string())
            })?;

        let http_status = response.status();
        let location = response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.unwrap_or_default();

        // Checkout URL priority: Location header, then a provider URL in
        // the body.
        let checkout_url = location
            .or_else(|| self.body_url.find(&body).map(|m| m.as_str().to_string()))
            .ok_or_else(|| {
                error!(
                    "Paymentlnk start without pay url: code={} body={}",
                    http_status,
                    super::body_snippet(&body)
                );
                AppError::upstream_protocol(PROVIDER, "response without pay url")
            })?;

        info!(
            "Paymentlnk start payment created: number={} url={}",
            ctx.payment_id, checkout_url
        );

        Ok(ProviderLink {
            payment_id: ctx.payment_id.clone(),
            checkout_url,
            trans_id: None,
        })
    }
}

fn origin_of(base_url: &str) -> String {
    // scheme://host, dropping any path
    match base_url.find("://").map(|i| i + 3) {
        Some(host_start) => {
            let host_end = base_url[host_start..]
                .find('/')
                .map(|i| host_start + i)
                .unwrap_or(base_url.len());
            base_url[..host_end].to_string()
        }
        None => base_url.trim_end_matches('/').to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct PlnkInvoiceResponse {
    #[serde(default)]
    status: String,
    #[serde(default, rename = "payURL")]
    pay_url: Option<String>,
    #[serde(default, rename = "transID")]
    trans_id: Option<String>,
    #[serde(default)]
    errorcode: Option<String>,
    #[serde(default)]
    errortext: Option<String>,
}

#[async_trait]
impl PaymentProvider for PaymentlnkProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Paymentlnk
    }

    async fn create_link(&self, ctx: &IssueContext) -> AppResult<ProviderLink> {
        info!(
            "Creating Paymentlnk payment: {} {} {} mode={:?}",
            ctx.amount, self.config.amountcurr, ctx.payment_id, self.config.mode
        );
        match self.config.mode {
            PlnkCreateMode::Invoice => self.create_invoice(ctx).await,
            PlnkCreateMode::Start => self.create_start(ctx).await,
        }
    }

    fn verify_webhook(
        &self,
        fields: &NormalizedFields,
        raw: serde_json::Value,
    ) -> AppResult<PaymentEvent> {
        let number = fields
            .get("number")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::validation("status callback missing number"))?;

        let account = fields.get("account").map(String::as_str).unwrap_or("");
        if account != self.config.account {
            warn!("Paymentlnk status for wrong account: {}", account);
            return Err(AppError::auth("status callback for unknown account"));
        }

        let amount = fields.get("amount").map(String::as_str).unwrap_or("");
        let status_raw = fields.get("status").map(String::as_str).unwrap_or("");
        let currency = fields
            .get("amountcurr")
            .cloned()
            .unwrap_or_else(|| self.config.amountcurr.clone());
        let candidate = fields
            .get("signature")
            .or_else(|| fields.get("sign"))
            .ok_or_else(|| AppError::auth("status callback missing signature"))?;

        let expected = self.status_signature(amount, &currency, number, status_raw);
        if !signature::verify_hex(candidate, &expected) {
            return Err(AppError::auth("invalid status callback signature"));
        }
        let trans_id = fields
            .get("transid")
            .filter(|v| !v.trim().is_empty())
            .cloned();
        let event_key = PaymentEvent::event_key(
            ProviderKind::Paymentlnk,
            trans_id.as_deref(),
            number,
            amount,
        );

        Ok(PaymentEvent {
            provider: ProviderKind::Paymentlnk,
            schema: WebhookSchema::PlnkInvoiceStatus,
            order_id: number.clone(),
            amount: amount.to_string(),
            currency,
            status: Self::normalize_status(status_raw),
            trans_id,
            event_key,
            raw,
        })
    }

    fn ack_body(&self) -> &str {
        &self.config.ack_body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PaymentlnkConfig {
        PaymentlnkConfig {
            account: "acc-1".to_string(),
            secret1: "s1".to_string(),
            secret2: "s2".to_string(),
            paysys: "EXT".to_string(),
            amountcurr: "RUB".to_string(),
            hash_alg: PlnkHashAlg::Md5,
            mode: PlnkCreateMode::Invoice,
            base_url: "https://start.paymentlnk.com/api/".to_string(),
            back_url: None,
            timeout_secs: 20,
            ack_body: "OK".to_string(),
        }
    }

    fn test_provider() -> PaymentlnkProvider {
        PaymentlnkProvider::new(test_config())
    }

    fn base_ctx<'a>() -> InvoiceSignatureContext<'a> {
        InvoiceSignatureContext {
            amount: "100.00",
            number: "order-1",
            description: "Order%20order-1",
            validity: "2026-01-01T00:00:00+00:00",
            first_name: "Client",
            cf1: None,
            cf2: None,
            cf3: None,
            email: None,
            notify_email: None,
            phone: None,
            notify_phone: None,
        }
    }

    #[test]
    fn invoice_base_without_optional_groups() {
        let provider = test_provider();
        let base = provider.invoice_base(&base_ctx());
        assert_eq!(
            base,
            "100.00:RUB:EXT:order-1:Order%20order-1:2026-01-01T00:00:00+00:00:Client:::acc-1:s1:s2"
        );
    }

    #[test]
    fn invoice_base_with_email_only_includes_email_pair() {
        let provider = test_provider();
        let mut ctx = base_ctx();
        ctx.email = Some("user@example.com");
        ctx.notify_email = Some("1");
        let base = provider.invoice_base(&ctx);
        assert!(base.contains(":user@example.com:1:acc-1:"));
        assert!(!base.contains("phone"));
    }

    #[test]
    fn invoice_base_with_cf_group_blanks_missing_members() {
        let provider = test_provider();
        let mut ctx = base_ctx();
        ctx.cf1 = Some("userid:42");
        let base = provider.invoice_base(&ctx);
        assert!(base.contains(":userid:42:::acc-1:"));
    }

    #[test]
    fn invoice_signature_is_uppercase_md5() {
        let provider = test_provider();
        let ctx = base_ctx();
        let sig = provider.invoice_signature(&ctx);
        assert_eq!(sig.len(), 32);
        assert_eq!(sig, sig.to_uppercase());
        assert_eq!(sig, signature::md5_hex_upper(&provider.invoice_base(&ctx)));
    }

    #[test]
    fn start_base_layout() {
        let provider = test_provider();
        let base = provider.start_base("50.00", "order-2", "Top%20up", Some("userid:7"));
        assert_eq!(
            base,
            "50.00:RUB:EXT:order-2:Top%20up:1:acc-1:userid:7:::s1:s2"
        );
    }

    #[test]
    fn start_signature_respects_hash_alg() {
        let md5_provider = test_provider();
        let base = md5_provider.start_base("50.00", "order-2", "Topup1", None);
        assert_eq!(
            md5_provider.start_signature(&base),
            signature::md5_hex_lower(&base)
        );

        let mut config = test_config();
        config.hash_alg = PlnkHashAlg::Sha256;
        let hmac_provider = PaymentlnkProvider::new(config);
        assert_eq!(
            hmac_provider.start_signature(&base),
            signature::hmac_sha256_hex(b"s1s2", base.as_bytes())
        );
    }

    #[test]
    fn description_is_padded_and_encoded() {
        assert_eq!(PaymentlnkProvider::prepare_description("abc"), "abc%20%20%20");
        assert_eq!(
            PaymentlnkProvider::prepare_description("Order 12"),
            "Order%2012"
        );
    }

    fn signed_status_fields(provider: &PaymentlnkProvider) -> NormalizedFields {
        let mut fields = NormalizedFields::new();
        fields.insert("number".to_string(), "order-1".to_string());
        fields.insert("amount".to_string(), "100.00".to_string());
        fields.insert("amountcurr".to_string(), "RUB".to_string());
        fields.insert("status".to_string(), "ok".to_string());
        fields.insert("account".to_string(), "acc-1".to_string());
        fields.insert("transid".to_string(), "555".to_string());
        let sig = provider.status_signature("100.00", "RUB", "order-1", "ok");
        fields.insert("signature".to_string(), sig);
        fields
    }

    #[test]
    fn verifies_status_callback() {
        let provider = test_provider();
        let fields = signed_status_fields(&provider);
        let event = provider
            .verify_webhook(&fields, serde_json::json!({}))
            .unwrap();
        assert_eq!(event.status, PaymentEventStatus::Success);
        assert_eq!(event.event_key, "paymentlnk:555");
        assert_eq!(event.schema, WebhookSchema::PlnkInvoiceStatus);
    }

    #[test]
    fn rejects_wrong_account() {
        let provider = test_provider();
        let mut fields = signed_status_fields(&provider);
        fields.insert("account".to_string(), "acc-2".to_string());
        let err = provider
            .verify_webhook(&fields, serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err.kind, crate::error::AppErrorKind::Auth { .. }));
    }

    #[test]
    fn rejects_tampered_currency() {
        let provider = test_provider();
        let mut fields = signed_status_fields(&provider);
        fields.insert("amountcurr".to_string(), "USD".to_string());
        let err = provider
            .verify_webhook(&fields, serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err.kind, crate::error::AppErrorKind::Auth { .. }));
    }

    #[test]
    fn event_currency_is_the_signed_value() {
        let provider = test_provider();
        let mut fields = NormalizedFields::new();
        fields.insert("number".to_string(), "order-1".to_string());
        fields.insert("amount".to_string(), "100.00".to_string());
        fields.insert("amountcurr".to_string(), "EUR".to_string());
        fields.insert("status".to_string(), "ok".to_string());
        fields.insert("account".to_string(), "acc-1".to_string());
        let sig = provider.status_signature("100.00", "EUR", "order-1", "ok");
        fields.insert("signature".to_string(), sig);

        let event = provider
            .verify_webhook(&fields, serde_json::json!({}))
            .unwrap();
        assert_eq!(event.currency, "EUR");
    }

    #[test]
    fn rejects_bad_status_signature() {
        let provider = test_provider();
        let mut fields = signed_status_fields(&provider);
        fields.insert(
            "signature".to_string(),
            "00000000000000000000000000000000".to_string(),
        );
        let err = provider
            .verify_webhook(&fields, serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err.kind, crate::error::AppErrorKind::Auth { .. }));
    }

    #[test]
    fn status_vocabulary_mapping() {
        assert_eq!(
            PaymentlnkProvider::normalize_status("OK"),
            PaymentEventStatus::Success
        );
        assert_eq!(
            PaymentlnkProvider::normalize_status("error"),
            PaymentEventStatus::Failed
        );
        assert_eq!(
            PaymentlnkProvider::normalize_status("wait"),
            PaymentEventStatus::Pending
        );
        assert_eq!(
            PaymentlnkProvider::normalize_status(""),
            PaymentEventStatus::Unknown
        );
    }

    #[test]
    fn origin_extraction() {
        assert_eq!(
            origin_of("https://start.paymentlnk.com/api/"),
            "https://start.paymentlnk.com"
        );
        assert_eq!(origin_of("https://host.example"), "https://host.example");
    }
}
