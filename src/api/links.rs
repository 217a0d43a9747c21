use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::info;

use crate::api::AppState;
use crate::error::{AppError, AppResult};
use crate::payments::types::{CreateLinkRequest, CreatedLink};

const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";
const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// Internal endpoint that turns an order into a hosted payment link.
pub async fn create_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateLinkRequest>,
) -> AppResult<Json<CreatedLink>> {
    authorize(&state, &headers)?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    info!(
        provider = %request.provider,
        amount = request.amount,
        idempotent = idempotency_key.is_some(),
        "create_link request received"
    );

    let link = state.issuer.issue(request, idempotency_key).await?;
    Ok(Json(link))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    let Some(expected) = state.config.server.internal_token.as_deref() else {
        return Ok(());
    };

    let presented = headers
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if presented != expected {
        return Err(AppError::auth("invalid internal token"));
    }
    Ok(())
}
