//! Access token lifecycle for the provider's credential endpoints

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::gateway::parse::{int_field, provider_detail, string_field};
use crate::gateway::GatewayError;

/// Tokens inside this window of their expiry are treated as stale
const REFRESH_BUFFER_SECS: i64 = 60;
/// Assumed lifetime when the exchange response carries no usable expiry
const DEFAULT_LIFETIME_SECS: i64 = 86_400;
/// Wall-clock expiry format some exchange responses use instead of a TTL
const WALL_CLOCK_EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TOKEN_PATH: &str = "/oauth2/tokenP";
const REVOKE_PATH: &str = "/oauth2/revokeP";
const APPROVAL_PATH: &str = "/oauth2/Approval";

#[derive(Debug, Clone)]
struct IssuedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl IssuedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_BUFFER_SECS) < self.expires_at
    }
}

/// Cached bearer token with single-flight refresh.
///
/// Readers take the fast path through the cache; a stale or missing token
/// sends exactly one caller through the exchange while the rest wait on the
/// issue lock and then re-read.
#[derive(Default)]
pub struct TokenCache {
    cached: RwLock<Option<IssuedToken>>,
    issue_lock: Mutex<()>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current bearer token, refreshing through the exchange endpoint when
    /// the cached one is absent or inside the refresh buffer.
    pub async fn access_token(
        &self,
        http: &Client,
        config: &ProviderConfig,
    ) -> Result<String, GatewayError> {
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        let _guard = self.issue_lock.lock().await;
        // Another caller may have refreshed while we waited on the lock.
        if let Some(token) = self.fresh_token().await {
            return Ok(token);
        }

        let issued = request_token(http, config).await?;
        let token = issued.token.clone();
        *self.cached.write().await = Some(issued);
        Ok(token)
    }

    /// Drop the cached token, then best-effort revoke it with the provider.
    /// The local cache is cleared even when the remote call fails.
    pub async fn revoke(&self, http: &Client, config: &ProviderConfig) {
        let taken = self.cached.write().await.take();
        let Some(issued) = taken else {
            debug!("no cached token to revoke");
            return;
        };
        if !config.is_configured() {
            return;
        }

        let url = format!("{}{}", config.base_url, REVOKE_PATH);
        let body = json!({
            "appkey": config.app_key,
            "appsecret": config.app_secret,
            "token": issued.token,
        });
        match http.post(&url).json(&body).send().await {
            Ok(response) => debug!(status = %response.status(), "token revoke acknowledged"),
            Err(err) => warn!(error = %err, "token revoke failed; local cache already cleared"),
        }
    }

    /// Handshake key required by the realtime feed's subscribe frames.
    pub async fn ws_approval_key(
        &self,
        http: &Client,
        config: &ProviderConfig,
    ) -> Result<String, GatewayError> {
        if !config.is_configured() {
            return Err(GatewayError::Misconfigured);
        }

        let url = format!("{}{}", config.base_url, APPROVAL_PATH);
        let body = json!({
            "grant_type": "client_credentials",
            "appkey": config.app_key,
            // The approval endpoint names the secret differently from the
            // token exchange.
            "secretkey": config.app_secret,
        });
        let payload: Value = http.post(&url).json(&body).send().await?.json().await?;
        string_field(&payload, &["approval_key", "approvalKey"])
            .ok_or_else(|| GatewayError::Protocol(provider_detail(&payload)))
    }

    async fn fresh_token(&self) -> Option<String> {
        let cached = self.cached.read().await;
        cached
            .as_ref()
            .filter(|t| t.is_fresh(Utc::now()))
            .map(|t| t.token.clone())
    }
}

async fn request_token(
    http: &Client,
    config: &ProviderConfig,
) -> Result<IssuedToken, GatewayError> {
    if !config.is_configured() {
        return Err(GatewayError::Misconfigured);
    }

    let url = format!("{}{}", config.base_url, TOKEN_PATH);
    let body = json!({
        "grant_type": "client_credentials",
        "appkey": config.app_key,
        "appsecret": config.app_secret,
    });
    let payload: Value = http.post(&url).json(&body).send().await?.json().await?;

    let Some(token) = string_field(&payload, &["access_token", "accessToken"]) else {
        return Err(GatewayError::Protocol(provider_detail(&payload)));
    };
    let expires_at = token_expiry(&payload, Utc::now());
    info!(expires_at = %expires_at, "provider access token issued");
    Ok(IssuedToken { token, expires_at })
}

/// Expiry instant from an exchange response: a TTL in `expires_in` wins,
/// then the wall-clock `access_token_token_expired` stamp, then the default
/// lifetime.
fn token_expiry(payload: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(secs) = int_field(payload, &["expires_in"]) {
        if secs > 0 {
            return now + Duration::seconds(secs);
        }
    }
    if let Some(stamp) = string_field(payload, &["access_token_token_expired"]) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&stamp, WALL_CLOCK_EXPIRY_FORMAT) {
            return DateTime::from_naive_utc_and_offset(naive, Utc);
        }
    }
    now + Duration::seconds(DEFAULT_LIFETIME_SECS)
}
