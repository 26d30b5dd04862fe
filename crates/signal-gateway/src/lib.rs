//! Signal gateway daemon client library.
//!
//! This crate provides a typed async client for the external Signal gateway
//! process, over HTTP. It supports:
//!
//! - Sending plain and styled messages
//! - Requesting device-linking QR codes and polling link completion
//! - Receiving messages via Server-Sent Events (SSE), with transparent
//!   reconnection
//! - Health checking and connection monitoring
//!
//! All failures surface as [`GatewayError`]; the client never retries sends —
//! retry policy belongs to callers.
//!
//! # Example
//!
//! ```no_run
//! use signal_gateway::{GatewayClient, GatewayConfig};
//!
//! # async fn example() -> Result<(), signal_gateway::GatewayError> {
//! // Connect to the gateway
//! let config = GatewayConfig::default();
//! let client = GatewayClient::connect(config).await?;
//!
//! // Send a message
//! let receipt = client.send_text("+1234567890", "Hello!").await?;
//! println!("Sent at timestamp: {}", receipt.timestamp);
//!
//! // Subscribe to incoming messages
//! use futures::StreamExt;
//! let mut messages = signal_gateway::subscribe(&client);
//! while let Some(envelope) = messages.next().await {
//!     if let Some(msg) = envelope.data_message {
//!         println!("From {}: {:?}", envelope.source, msg.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod sse;
pub mod types;

pub use client::GatewayClient;
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use sse::{subscribe, subscribe_with_reconnect, ReceiveStream, ReconnectConfig};
pub use types::*;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
