//! Link issuance orchestrator
//!
//! Public entry point for creating payment links: validates input, consults
//! the idempotency cache, delegates to the selected provider adapter,
//! registers the short link and assembles the caller-visible response.

use crate::error::{AppError, AppResult};
use crate::idempotency::IdempotencyCache;
use crate::payments::traits::PaymentProvider;
use crate::payments::types::{format_amount, CreateLinkRequest, CreatedLink, IssueContext, ProviderKind};
use crate::shortlink::ShortLinkStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// TTL bounds in minutes; out-of-range values are clamped, not rejected
/// (deliberate leniency: a badly configured caller still gets a working
/// link).
pub const MIN_TTL_MINUTES: i64 = 1;
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 30;

/// Per-method minimum amounts (Freekassa method codes); anything else uses
/// the default.
fn min_amount_for(method: Option<u32>) -> f64 {
    match method {
        Some(44) => 10.0,
        Some(35) | Some(36) => 50.0,
        _ => 50.0,
    }
}

pub struct LinkIssuer {
    providers: HashMap<ProviderKind, Arc<dyn PaymentProvider>>,
    idempotency: IdempotencyCache,
    links: Arc<ShortLinkStore>,
    public_base_url: String,
    default_ttl_minutes: i64,
}

impl LinkIssuer {
    pub fn new(
        providers: Vec<Arc<dyn PaymentProvider>>,
        idempotency: IdempotencyCache,
        links: Arc<ShortLinkStore>,
        public_base_url: String,
        default_ttl_minutes: i64,
    ) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.kind(), p)).collect(),
            idempotency,
            links,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            default_ttl_minutes,
        }
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&Arc<dyn PaymentProvider>> {
        self.providers.get(&kind)
    }

    /// Issue a payment link.
    ///
    /// With an idempotency key, a repeated call within the record TTL
    /// replays the first response verbatim and performs no provider call;
    /// the short link is re-registered so the redirect stays live.
    pub async fn issue(
        &self,
        request: CreateLinkRequest,
        idempotency_key: Option<&str>,
    ) -> AppResult<CreatedLink> {
        let ttl_minutes = self.validate(&request)?;
        let ttl = Duration::from_secs((ttl_minutes * 60) as u64);

        let provider = self.providers.get(&request.provider).ok_or_else(|| {
            AppError::configuration(format!(
                "provider {} is not configured",
                request.provider
            ))
        })?;

        if let Some(key) = idempotency_key {
            if let Some(cached) = self.idempotency.get(key).await {
                // Keep the redirect alive for the retry window.
                self.links
                    .put(&cached.token, &cached.provider_url, ttl)
                    .await?;
                self.idempotency.set(key, &cached).await;
                return Ok(cached);
            }
        }

        let payment_id = request
            .payment_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(generate_payment_id);

        let ctx = IssueContext {
            amount: format_amount(request.amount),
            method: request.method,
            email: request.email.clone().filter(|e| !e.trim().is_empty()),
            phone: request.phone.clone().filter(|p| !p.trim().is_empty()),
            description: request.description.clone(),
            payment_id,
            ttl_minutes,
            first_name: request.first_name.clone(),
            cf1: request.cf1.clone(),
            ip: request.ip.clone().unwrap_or_else(|| "0.0.0.0".to_string()),
        };

        let link = provider.create_link(&ctx).await?;

        let token = idempotency_key
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        // Losing this write would break the public redirect, so it fails
        // loudly, and no idempotency record is written for the attempt.
        let stored = self.links.put(&token, &link.checkout_url, ttl).await?;

        let created = CreatedLink {
            public_url: format!("{}/pay/{}", self.public_base_url, token),
            token,
            payment_id: link.payment_id,
            trans_id: link.trans_id,
            provider_url: link.checkout_url,
            expires_at: stored.expires_at,
            provider: request.provider,
        };

        if let Some(key) = idempotency_key {
            self.idempotency.set(key, &created).await;
        }

        info!(
            "Issued link payment_id={} provider={} token={}",
            created.payment_id, created.provider, created.token
        );
        Ok(created)
    }

    /// Validate the request, returning the clamped TTL in minutes.
    fn validate(&self, request: &CreateLinkRequest) -> AppResult<i64> {
        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(AppError::validation("amount must be a positive number"));
        }

        let min = min_amount_for(request.method);
        if request.amount < min {
            return Err(AppError::validation(format!(
                "minimum amount for the selected method is {}",
                format_amount(min)
            )));
        }

        if request.provider == ProviderKind::Freekassa
            && request
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .is_none()
        {
            return Err(AppError::validation("email is required for freekassa payments"));
        }

        let requested = request.ttl_minutes.unwrap_or(self.default_ttl_minutes);
        let clamped = requested.clamp(MIN_TTL_MINUTES, MAX_TTL_MINUTES);
        if clamped != requested {
            warn!(
                "Clamped requested ttl {}m to {}m",
                requested, clamped
            );
        }
        Ok(clamped)
    }
}

fn generate_payment_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("pl-{}-{}", millis, &suffix[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_minimums() {
        assert_eq!(min_amount_for(Some(44)), 10.0);
        assert_eq!(min_amount_for(Some(36)), 50.0);
        assert_eq!(min_amount_for(None), 50.0);
    }

    #[test]
    fn payment_ids_are_unique() {
        assert_ne!(generate_payment_id(), generate_payment_id());
    }
}
