//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

/// Bridge server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Signal gateway URL.
    pub gateway_url: String,
    /// Gateway account phone number (multi-account mode).
    pub gateway_account: Option<String>,
    /// Key for phone-number encryption at rest (hex or base64, 32 bytes).
    pub phone_cipher_key: String,
    /// Application base URL used in deep links.
    pub app_base_url: String,
    /// Chat service base URL the listener deposits messages into.
    pub chat_api_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `BRIDGE_ADDR` | Server bind address | `127.0.0.1:8787` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:bridge.db?mode=rwc` |
    /// | `SIGNAL_GATEWAY_URL` | Signal gateway URL | `http://127.0.0.1:8080` |
    /// | `SIGNAL_GATEWAY_ACCOUNT` | Gateway account number | (optional) |
    /// | `PHONE_CIPHER_KEY` | Phone encryption key | (required) |
    /// | `APP_BASE_URL` | App base URL for deep links | `http://localhost:3000` |
    /// | `CHAT_API_URL` | Chat service base URL | `http://127.0.0.1:3000` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("BRIDGE_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8787".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            env::var("SQLITE_PATH").unwrap_or_else(|_| "sqlite:bridge.db?mode=rwc".to_string());

        let gateway_url = env::var("SIGNAL_GATEWAY_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());

        let gateway_account = env::var("SIGNAL_GATEWAY_ACCOUNT").ok();

        let phone_cipher_key =
            env::var("PHONE_CIPHER_KEY").map_err(|_| ConfigError::MissingCipherKey)?;

        let app_base_url =
            env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let chat_api_url =
            env::var("CHAT_API_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

        Ok(Self {
            addr,
            database_url,
            gateway_url,
            gateway_account,
            phone_cipher_key,
            app_base_url,
            chat_api_url,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid BRIDGE_ADDR format")]
    InvalidAddr,

    #[error("PHONE_CIPHER_KEY environment variable is required")]
    MissingCipherKey,
}
