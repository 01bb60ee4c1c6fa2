//! Configuration and credentials for the exchange client.
//!
//! This module provides the [`Config`] struct for managing API credentials,
//! endpoints and connection settings, and [`ReconnectConfig`] for the
//! WebSocket backoff policy.

use std::time::Duration;

use crate::error::Error;

/// Default REST API base URL
pub const DEFAULT_REST_URL: &str = "https://api.exchange.cryptomkt.com/api/2";

/// Default WebSocket URL
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://api.exchange.cryptomkt.com/api/2/ws";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "CRYPTOMARKET_API_KEY";

/// Environment variable holding the API secret
pub const API_SECRET_ENV: &str = "CRYPTOMARKET_API_SECRET";

/// API key and secret pair
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Create a credential pair
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the API secret
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for the exchange client
///
/// # Example
///
/// ```rust
/// use cryptomarket::Config;
///
/// // Market data only, no credentials
/// let config = Config::public();
///
/// // Trading account access
/// let config = Config::new("my-api-key", "my-api-secret")
///     .with_timeout(std::time::Duration::from_secs(30));
/// assert!(config.credentials().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// API credentials (None for public market data only)
    credentials: Option<Credentials>,

    /// REST API base URL
    rest_base_url: String,

    /// WebSocket URL
    websocket_url: String,

    /// HTTP request timeout
    timeout: Duration,

    /// WebSocket reconnection policy
    reconnect: ReconnectConfig,

    /// How long a book may wait for its recovery snapshot before the
    /// subscription is requested again
    resync_timeout: Duration,
}

impl Config {
    /// Create a new configuration with API credentials
    ///
    /// # Arguments
    ///
    /// * `api_key` - Your API key
    /// * `api_secret` - Your API secret
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            credentials: Some(Credentials::new(api_key, api_secret)),
            ..Self::public()
        }
    }

    /// Create a configuration without credentials (public endpoints only)
    pub fn public() -> Self {
        Self {
            credentials: None,
            rest_base_url: DEFAULT_REST_URL.to_string(),
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            timeout: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
            resync_timeout: Duration::from_secs(10),
        }
    }

    /// Create a configuration from `CRYPTOMARKET_API_KEY` and
    /// `CRYPTOMARKET_API_SECRET`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either variable is not set.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::Config(format!("{} not set", API_KEY_ENV)))?;
        let api_secret = std::env::var(API_SECRET_ENV)
            .map_err(|_| Error::Config(format!("{} not set", API_SECRET_ENV)))?;
        Ok(Self::new(api_key, api_secret))
    }

    /// Override the REST API base URL
    #[must_use]
    pub fn with_rest_base_url(mut self, url: impl Into<String>) -> Self {
        self.rest_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the WebSocket URL
    #[must_use]
    pub fn with_websocket_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_url = url.into();
        self
    }

    /// Set the HTTP request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the WebSocket reconnection policy
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set how long a book may wait for its recovery snapshot
    #[must_use]
    pub fn with_resync_timeout(mut self, timeout: Duration) -> Self {
        self.resync_timeout = timeout;
        self
    }

    /// Get the credentials, if any
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Get the REST API base URL
    pub fn rest_base_url(&self) -> &str {
        &self.rest_base_url
    }

    /// Get the WebSocket URL
    pub fn websocket_url(&self) -> &str {
        &self.websocket_url
    }

    /// Get the timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the reconnection policy
    pub fn reconnect(&self) -> &ReconnectConfig {
        &self.reconnect
    }

    /// Get the recovery snapshot timeout
    pub fn resync_timeout(&self) -> Duration {
        self.resync_timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::public()
    }
}

/// Configuration for reconnection behavior
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts (0 = infinite)
    pub max_retries: u32,
    /// Initial delay between reconnection attempts
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Create a new reconnect config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum retries (0 = infinite)
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set initial delay in milliseconds
    pub fn initial_delay_ms(mut self, ms: u64) -> Self {
        self.initial_delay_ms = ms;
        self
    }

    /// Set maximum delay in milliseconds
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Set backoff multiplier
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculate delay for a given retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::new("test-key", "test-secret");
        let creds = config.credentials().unwrap();
        assert_eq!(creds.api_key(), "test-key");
        assert_eq!(creds.api_secret(), "test-secret");
        assert_eq!(config.rest_base_url(), DEFAULT_REST_URL);
        assert_eq!(config.websocket_url(), DEFAULT_WEBSOCKET_URL);
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_public_config() {
        let config = Config::public();
        assert!(config.credentials().is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = Config::public()
            .with_rest_base_url("http://localhost:8080/api/2/")
            .with_websocket_url("ws://localhost:8080/ws")
            .with_timeout(Duration::from_secs(30))
            .with_resync_timeout(Duration::from_secs(3))
            .with_reconnect(ReconnectConfig::new().max_retries(2));

        assert_eq!(config.rest_base_url(), "http://localhost:8080/api/2");
        assert_eq!(config.websocket_url(), "ws://localhost:8080/ws");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.resync_timeout(), Duration::from_secs(3));
        assert_eq!(config.reconnect().max_retries, 2);
    }

    #[test]
    fn test_secret_not_in_debug() {
        let config = Config::new("key", "super-secret");
        let debug = format!("{:?}", config);
        assert!(debug.contains("key"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_reconnect_config_default() {
        let config = ReconnectConfig::default();
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.initial_delay_ms, 100);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delay_calculation() {
        let config = ReconnectConfig::new()
            .initial_delay_ms(100)
            .backoff_multiplier(2.0)
            .max_delay_ms(1000);

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(800));
        // Should cap at max_delay_ms
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(1000));
    }
}
