//! Process-wide feed configuration.

use reqwest::Url;

use crate::error::ConfigError;

pub const DEFAULT_FEED_URL: &str = "https://api.nasa.gov/neo/rest/v1/feed";

/// NASA's public, rate-limited key.
pub const DEFAULT_API_KEY: &str = "DEMO_KEY";

/// Where the feed lives and the credential used to call it.
///
/// Read from the environment (after `.env` has been loaded):
/// - `NEO_FEED_URL` – feed endpoint, defaults to [`DEFAULT_FEED_URL`]
/// - `NASA_API_KEY` – sent as the `api_key` query parameter, defaults to
///   [`DEFAULT_API_KEY`]
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub endpoint: Url,
    pub api_key: String,
}

impl FeedConfig {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            value: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint {
                value: endpoint.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(Self {
            endpoint: parsed,
            api_key: api_key.to_string(),
        })
    }

    /// Loads the config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads the config through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("NEO_FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string());
        let api_key = lookup("NASA_API_KEY").unwrap_or_else(|| DEFAULT_API_KEY.to_string());
        Self::new(&endpoint, &api_key)
    }
}
