//! Error types for signal-gateway.

use thiserror::Error;

/// Errors that can occur when interacting with the Signal gateway daemon.
///
/// Callers treat any of these as "gateway unavailable" — retry policy lives
/// with the caller, not the transport.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON-RPC error response from the gateway.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// Connection to the gateway failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Gateway health check failed.
    #[error("Health check failed")]
    HealthCheckFailed,
}
