use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use crate::api::AppState;
use crate::error::AppResult;

/// Resolves a short token and bounces the payer to the hosted checkout page.
pub async fn pay_redirect(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Response> {
    match state.links.resolve(&token).await? {
        Some(link) => {
            debug!(%token, "short link resolved");
            Ok((
                StatusCode::FOUND,
                [(header::LOCATION, link.target_url)],
            )
                .into_response())
        }
        None => {
            debug!(%token, "short link missing or expired");
            let body = serde_json::json!({
                "error": "not_found",
                "detail": "payment link not found or expired",
            });
            Ok((StatusCode::NOT_FOUND, Json(body)).into_response())
        }
    }
}
