//! Provider endpoints and credentials from the environment

use serde::{Deserialize, Serialize};

/// Production REST host
pub const LIVE_BASE_URL: &str = "https://openapi.koreainvestment.com:9443";
/// Paper-trading REST host
pub const MOCK_BASE_URL: &str = "https://openapivts.koreainvestment.com:29443";
/// Production realtime feed endpoint
pub const LIVE_WS_URL: &str = "ws://ops.koreainvestment.com:21000";
/// Paper-trading realtime feed endpoint
pub const MOCK_WS_URL: &str = "ws://ops.koreainvestment.com:31000";

/// Connection settings for the market data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub app_key: String,
    pub app_secret: String,
    pub base_url: String,
    pub ws_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            app_key: String::new(),
            app_secret: String::new(),
            base_url: LIVE_BASE_URL.to_string(),
            ws_url: LIVE_WS_URL.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Settings from `KIS_*` environment variables. `KIS_USE_MOCK` flips the
    /// default hosts to the paper-trading endpoints; explicit URL variables
    /// win over either default.
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::var("KIS_APP_KEY").ok(),
            std::env::var("KIS_APP_SECRET").ok(),
            std::env::var("KIS_BASE_URL").ok(),
            std::env::var("KIS_WS_URL").ok(),
            std::env::var("KIS_USE_MOCK").ok(),
        )
    }

    fn resolve(
        app_key: Option<String>,
        app_secret: Option<String>,
        base_url: Option<String>,
        ws_url: Option<String>,
        use_mock: Option<String>,
    ) -> Self {
        let mock = use_mock
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let default_base = if mock { MOCK_BASE_URL } else { LIVE_BASE_URL };
        let default_ws = if mock { MOCK_WS_URL } else { LIVE_WS_URL };

        Self {
            app_key: app_key.unwrap_or_default().trim().to_string(),
            app_secret: app_secret.unwrap_or_default().trim().to_string(),
            base_url: base_url
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default_base.to_string()),
            ws_url: ws_url
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default_ws.to_string()),
        }
    }

    /// Both credentials present. Provider-backed features stay off otherwise.
    pub fn is_configured(&self) -> bool {
        !self.app_key.is_empty() && !self.app_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_live_hosts() {
        let config = ProviderConfig::resolve(None, None, None, None, None);
        assert_eq!(config.base_url, LIVE_BASE_URL);
        assert_eq!(config.ws_url, LIVE_WS_URL);
        assert!(!config.is_configured());
    }

    #[test]
    fn mock_flag_flips_default_hosts() {
        let config = ProviderConfig::resolve(None, None, None, None, Some("true".into()));
        assert_eq!(config.base_url, MOCK_BASE_URL);
        assert_eq!(config.ws_url, MOCK_WS_URL);

        let config = ProviderConfig::resolve(None, None, None, None, Some("0".into()));
        assert_eq!(config.base_url, LIVE_BASE_URL);
    }

    #[test]
    fn explicit_urls_win_over_mock_flag() {
        let config = ProviderConfig::resolve(
            Some(" key ".into()),
            Some("secret".into()),
            Some("http://localhost:9999".into()),
            None,
            Some("yes".into()),
        );
        assert_eq!(config.base_url, "http://localhost:9999");
        assert_eq!(config.ws_url, MOCK_WS_URL);
        assert_eq!(config.app_key, "key");
        assert!(config.is_configured());
    }
}
