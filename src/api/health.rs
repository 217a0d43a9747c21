use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::payments::types::ProviderKind;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub freekassa_configured: bool,
    pub paymentlnk_configured: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.config.server.environment.clone(),
        freekassa_configured: state.enabled_providers.contains(&ProviderKind::Freekassa),
        paymentlnk_configured: state.enabled_providers.contains(&ProviderKind::Paymentlnk),
    };

    Json(response)
}
