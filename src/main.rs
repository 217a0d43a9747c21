use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use paylink_gateway::api::{self, AppState};
use paylink_gateway::cache::{init_cache_pool, Cache, CacheConfig, InMemoryCache, RedisCache};
use paylink_gateway::config::Config;
use paylink_gateway::events::{EventPublisher, InMemoryPublisher, RedisStreamPublisher};
use paylink_gateway::idempotency::IdempotencyCache;
use paylink_gateway::payments::orchestrator::LinkIssuer;
use paylink_gateway::payments::providers::{
    FreekassaConfig, FreekassaProvider, PaymentlnkConfig, PaymentlnkProvider,
};
use paylink_gateway::payments::traits::PaymentProvider;
use paylink_gateway::payments::webhook::WebhookProcessor;
use paylink_gateway::shortlink::ShortLinkStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    tracing::info!("Starting payment-link gateway");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Public base URL: {}", config.server.public_base_url);

    // Configure providers; each one is optional but at least one must exist.
    let mut providers: Vec<Arc<dyn PaymentProvider>> = Vec::new();
    if let Some(fk) = FreekassaConfig::from_env()? {
        tracing::info!("Freekassa provider enabled");
        providers.push(Arc::new(FreekassaProvider::new(fk)));
    }
    if let Some(plnk) = PaymentlnkConfig::from_env()? {
        tracing::info!("Paymentlnk provider enabled (mode={:?})", plnk.mode);
        providers.push(Arc::new(PaymentlnkProvider::new(plnk)));
    }
    if providers.is_empty() {
        return Err("no payment provider configured".into());
    }
    let enabled_providers = providers.iter().map(|p| p.kind()).collect();

    // Redis backs the caches and the event stream; if the pool cannot be
    // created the process falls back to in-memory storage and logs loudly,
    // so a local run without Redis still serves links.
    let (cache, publisher): (Arc<dyn Cache>, Arc<dyn EventPublisher>) =
        match init_cache_pool(CacheConfig {
            redis_url: config.redis.url.clone(),
            ..CacheConfig::default()
        })
        .await
        {
            Ok(pool) => (
                Arc::new(RedisCache::new(pool.clone())),
                Arc::new(RedisStreamPublisher::new(
                    pool,
                    config.links.event_stream.clone(),
                )),
            ),
            Err(e) => {
                tracing::error!(
                    "Redis unavailable, using in-memory storage (links will not survive restarts): {}",
                    e
                );
                (Arc::new(InMemoryCache::new()), Arc::new(InMemoryPublisher::new()))
            }
        };

    let links = Arc::new(ShortLinkStore::new(cache.clone()));
    let idempotency = IdempotencyCache::new(
        cache,
        Duration::from_secs(config.links.idempotency_ttl_secs),
    );

    let issuer = Arc::new(LinkIssuer::new(
        providers.clone(),
        idempotency,
        links.clone(),
        config.server.public_base_url.clone(),
        config.links.default_ttl_minutes,
    ));
    let webhooks = Arc::new(WebhookProcessor::new(providers, publisher));

    let state = AppState {
        config: config.clone(),
        issuer,
        links,
        webhooks,
        enabled_providers,
    };

    let app = api::router(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
