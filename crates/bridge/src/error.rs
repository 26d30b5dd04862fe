//! Error types for bridge operations.

use thiserror::Error;

/// Errors that can occur in the bridge core.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Gateway transport failure (recoverable; callers retry or surface
    /// "try again").
    #[error("gateway error: {0}")]
    Gateway(#[from] signal_gateway::GatewayError),

    /// Persistence failure.
    #[error("store error: {0}")]
    Store(bridge_store::StoreError),

    /// The user already has an active Signal link.
    #[error("user already linked: {0}")]
    AlreadyLinked(String),

    /// The user has no Signal link.
    #[error("user not linked: {0}")]
    NotLinked(String),

    /// The gateway reported a completed link without account metadata.
    #[error("link completed without a registered number")]
    LinkMetadataMissing,

    /// Chat pipeline rejected a forwarded message.
    #[error("chat pipeline error: {0}")]
    Chat(String),
}

impl From<bridge_store::StoreError> for BridgeError {
    fn from(err: bridge_store::StoreError) -> Self {
        match err {
            bridge_store::StoreError::AlreadyLinked(user) => Self::AlreadyLinked(user),
            other => Self::Store(other),
        }
    }
}
