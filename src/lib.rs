pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod idempotency;
pub mod payments;
pub mod shortlink;
pub mod signature;
