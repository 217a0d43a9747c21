//! Payment provider integration
//!
//! Unified interface over the integrated payment providers, the issuance
//! orchestrator and the webhook verification pipeline.

pub mod orchestrator;
pub mod providers;
pub mod traits;
pub mod types;
pub mod webhook;
