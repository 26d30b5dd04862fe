//! Configuration types for signal-gateway.

/// Configuration for connecting to the Signal gateway daemon.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway HTTP server (e.g., "http://localhost:8080").
    pub base_url: String,
    /// Account phone number for multi-account mode.
    /// If None, assumes single-account mode.
    pub account: Option<String>,
    /// Device name presented when requesting a linking QR code.
    pub device_name: String,
}

impl GatewayConfig {
    /// Create a new configuration with the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            account: None,
            device_name: "signal-bridge".to_string(),
        }
    }

    /// Create configuration with a specific account for multi-account mode.
    pub fn with_account(base_url: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            ..Self::new(base_url)
        }
    }

    /// Set the device name used for linking.
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Get the RPC endpoint URL.
    pub fn rpc_url(&self) -> String {
        format!("{}/api/v1/rpc", self.base_url)
    }

    /// Get the events endpoint URL (with account query param if set).
    pub fn events_url(&self) -> String {
        match &self.account {
            Some(account) => {
                let encoded = urlencoding::encode(account);
                format!("{}/api/v1/events?account={}", self.base_url, encoded)
            }
            None => format!("{}/api/v1/events", self.base_url),
        }
    }

    /// Get the health check endpoint URL.
    pub fn check_url(&self) -> String {
        format!("{}/api/v1/check", self.base_url)
    }

    /// Get the linking QR code endpoint URL.
    ///
    /// The gateway renders the QR image itself; the code is single-use and
    /// time-limited, so the response must never be cached.
    pub fn qr_link_url(&self) -> String {
        let encoded = urlencoding::encode(&self.device_name);
        format!("{}/api/v1/qrcodelink?device_name={}", self.base_url, encoded)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}
