//! Signal gateway daemon HTTP client.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::types::{LinkStatus, SendParams, SendReceipt, TextStyleParam};

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<T>,
    id: u64,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<RpcError>,
    #[allow(dead_code)]
    id: u64,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// Version response from the gateway.
#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Account number response from the gateway.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountResponse {
    /// Plain string response.
    String(String),
    /// Object with number field.
    Object { number: String },
}

/// Client for communicating with the Signal gateway daemon.
#[derive(Clone)]
pub struct GatewayClient {
    http: Client,
    config: GatewayConfig,
    request_id: Arc<AtomicU64>,
    connected: Arc<AtomicBool>,
}

impl GatewayClient {
    /// Connect to the gateway daemon.
    pub async fn connect(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(GatewayError::Http)?;

        let client = Self {
            http,
            config,
            request_id: Arc::new(AtomicU64::new(1)),
            connected: Arc::new(AtomicBool::new(false)),
        };

        // Verify connection with health check
        if client.health_check().await? {
            client.connected.store(true, Ordering::SeqCst);
            info!("Connected to Signal gateway at {}", client.config.base_url);
        } else {
            return Err(GatewayError::HealthCheckFailed);
        }

        Ok(client)
    }

    /// Check if currently connected to the gateway.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Perform a health check against the gateway.
    pub async fn health_check(&self) -> Result<bool, GatewayError> {
        let url = self.config.check_url();
        debug!("Health check: {}", url);

        match self.http.get(&url).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                self.connected.store(ok, Ordering::SeqCst);
                Ok(ok)
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(GatewayError::Http(e))
            }
        }
    }

    /// Get the gateway software version.
    pub async fn version(&self) -> Result<String, GatewayError> {
        let resp: VersionResponse = self.rpc_call::<(), _>("version", None).await?;
        Ok(resp.version)
    }

    /// Get the gateway account's phone number.
    pub async fn get_self_number(&self) -> Result<String, GatewayError> {
        let resp: AccountResponse = self.rpc_call::<(), _>("getSelfNumber", None).await?;
        match resp {
            AccountResponse::String(s) => Ok(s),
            AccountResponse::Object { number } => Ok(number),
        }
    }

    /// Request a fresh linking QR code from the gateway.
    ///
    /// Returns the raw image bytes (PNG). The code is single-use and
    /// time-limited; callers must not cache it across requests.
    pub async fn request_link_qr_code(&self) -> Result<Vec<u8>, GatewayError> {
        let url = self.config.qr_link_url();
        debug!("Requesting link QR code: {}", url);

        let response = self.http.get(&url).send().await.map_err(GatewayError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Connection(format!("HTTP {}: {}", status, body)));
        }

        let bytes = response.bytes().await.map_err(GatewayError::Http)?;
        Ok(bytes.to_vec())
    }

    /// Check whether a previously requested link has been confirmed.
    ///
    /// Once complete, `number` carries the phone number now registered with
    /// the gateway.
    pub async fn link_status(&self) -> Result<LinkStatus, GatewayError> {
        self.rpc_call::<(), _>("linkStatus", None).await
    }

    /// Send a message using the full SendParams structure.
    pub async fn send(&self, mut params: SendParams) -> Result<SendReceipt, GatewayError> {
        // Add account if configured and not already set
        if params.account.is_none() {
            params.account = self.config.account.clone();
        }

        self.rpc_call("send", Some(params)).await
    }

    /// Send a plain text message to a recipient.
    pub async fn send_text(
        &self,
        recipient: &str,
        message: &str,
    ) -> Result<SendReceipt, GatewayError> {
        let params = SendParams::text(recipient, message);
        self.send(params).await
    }

    /// Send a styled text message to a recipient.
    ///
    /// # Arguments
    /// * `recipient` - Phone number to send to
    /// * `message` - Plain text content
    /// * `styles` - Text style ranges for formatting
    pub async fn send_styled_text(
        &self,
        recipient: &str,
        message: &str,
        styles: Vec<TextStyleParam>,
    ) -> Result<SendReceipt, GatewayError> {
        let params = SendParams::text(recipient, message).with_styles(styles);
        self.send(params).await
    }

    /// Start a background health monitor that periodically checks the gateway.
    pub fn start_health_monitor(&self, interval: Duration) -> JoinHandle<()> {
        let client = self.clone();

        tokio::spawn(async move {
            let mut consecutive_failures = 0u32;

            loop {
                tokio::time::sleep(interval).await;

                match client.health_check().await {
                    Ok(true) => {
                        if consecutive_failures > 0 {
                            info!("Gateway connection restored");
                        }
                        consecutive_failures = 0;
                    }
                    Ok(false) => {
                        consecutive_failures += 1;
                        warn!(
                            "Health check returned not OK (failures: {})",
                            consecutive_failures
                        );
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(
                            "Health check failed: {} (failures: {})",
                            e, consecutive_failures
                        );
                    }
                }
            }
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Get the underlying HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.http
    }

    /// Make a JSON-RPC call to the gateway.
    async fn rpc_call<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, GatewayError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let url = self.config.rpc_url();

        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        debug!("RPC call: {} (id={})", method, id);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(GatewayError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Connection(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let rpc_response: RpcResponse<R> = response.json().await.map_err(GatewayError::Http)?;

        if let Some(error) = rpc_response.error {
            return Err(GatewayError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response.result.ok_or_else(|| GatewayError::Rpc {
            code: -1,
            message: "No result in response".to_string(),
        })
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .finish()
    }
}
