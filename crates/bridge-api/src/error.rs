//! Error types for the bridge HTTP surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use bridge::BridgeError;

/// Errors that can occur in API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bridge core error.
    #[error("{0}")]
    Bridge(#[from] BridgeError),

    /// Store error from direct banner/preference access.
    #[error("{0}")]
    Store(#[from] bridge_store::StoreError),

    /// Missing or empty user identity header.
    #[error("Missing user identity")]
    Unauthorized,

    /// Malformed request payload.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The user has no Signal link.
    #[error("Not linked")]
    NotLinked,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Bridge(BridgeError::AlreadyLinked(_)) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            ApiError::Bridge(BridgeError::NotLinked(_)) | ApiError::NotLinked => {
                (StatusCode::NOT_FOUND, "not linked".to_string())
            }
            ApiError::Bridge(BridgeError::Gateway(err)) => {
                tracing::warn!("Gateway unavailable: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    "Signal gateway unavailable, try again".to_string(),
                )
            }
            ApiError::Store(bridge_store::StoreError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Bridge(err) => {
                tracing::error!("Bridge error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Store(err) => {
                tracing::error!("Store error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
