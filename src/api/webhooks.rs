use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use tracing::{info, warn};

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::payments::traits::NormalizedFields;
use crate::payments::webhook::{normalize_form, normalize_json};

/// Shared callback endpoint for all providers.
///
/// Providers differ in both payload shape and content type, so the body is
/// read raw and decoded by the declared content type before schema detection.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<String> {
    let (fields, raw) = decode_body(&headers, &body)?;

    info!(fields = fields.len(), "webhook received");

    let ack = state.webhooks.process(&fields, raw).await?;
    Ok(ack)
}

fn decode_body(
    headers: &HeaderMap,
    body: &Bytes,
) -> AppResult<(NormalizedFields, serde_json::Value)> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_lowercase();

    if content_type.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| AppError::validation(format!("invalid JSON body: {e}")))?;
        let fields = normalize_json(&value);
        return Ok((fields, value));
    }

    if content_type.starts_with("application/x-www-form-urlencoded") || content_type.is_empty() {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
            .map_err(|e| AppError::validation(format!("invalid form body: {e}")))?;
        let raw = serde_json::Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        );
        return Ok((normalize_form(pairs), raw));
    }

    warn!(%content_type, "webhook with unsupported content type");
    Err(AppError::validation(format!(
        "unsupported content type: {content_type}"
    )))
}
