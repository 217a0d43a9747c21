//! HTTP surface of the gateway

pub mod health;
pub mod links;
pub mod redirect;
pub mod webhooks;

use crate::config::Config;
use crate::payments::orchestrator::LinkIssuer;
use crate::payments::types::ProviderKind;
use crate::payments::webhook::WebhookProcessor;
use crate::shortlink::ShortLinkStore;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub issuer: Arc<LinkIssuer>,
    pub links: Arc<ShortLinkStore>,
    pub webhooks: Arc<WebhookProcessor>,
    /// Providers that passed configuration at startup.
    pub enabled_providers: Vec<ProviderKind>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/internal/create_link", post(links::create_link))
        .route("/pay/:token", get(redirect::pay_redirect))
        .route("/webhook", post(webhooks::handle_webhook))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
