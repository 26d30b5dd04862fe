//! Application state shared across handlers.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use bridge::{DeliveryPipeline, LinkManager};
use bridge_store::Database;
use signal_gateway::GatewayClient;

use crate::error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Link manager.
    pub link: Arc<LinkManager<GatewayClient>>,
    /// Outbound delivery pipeline.
    pub delivery: DeliveryPipeline<GatewayClient>,
    /// Gateway client (health checks).
    pub gateway: GatewayClient,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        db: Database,
        link: LinkManager<GatewayClient>,
        delivery: DeliveryPipeline<GatewayClient>,
        gateway: GatewayClient,
    ) -> Self {
        Self {
            db,
            link: Arc::new(link),
            delivery,
            gateway,
        }
    }
}

/// The caller's identity, resolved by the session layer upstream and passed
/// down in the `x-user-id` header.
#[derive(Debug, Clone)]
pub struct UserId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| UserId(value.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}
