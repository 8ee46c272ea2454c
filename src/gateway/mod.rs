//! Market data gateway for the provider's REST endpoints
//!
//! Wraps token issuance, quote/ranking/index lookups and the paper-trade
//! order stubs behind one client. Response payloads are parsed defensively
//! because the provider spreads the same field across several key spellings.

pub mod client;
pub mod parse;
pub mod token;
pub mod types;

use thiserror::Error;

pub use client::MarketGateway;
pub use token::TokenCache;

/// Failures surfaced by gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Credentials absent; callers should treat provider features as off
    #[error("market data provider is not configured")]
    NotConfigured,
    /// Credential exchange attempted without an app key and secret
    #[error("credential exchange requires an app key and secret")]
    Misconfigured,
    /// Transport-level failure talking to the provider
    #[error("provider request failed: {0}")]
    Unavailable(#[from] reqwest::Error),
    /// Provider answered but refused the call or returned an unusable payload
    #[error("provider rejected the request: {0}")]
    Protocol(String),
}
