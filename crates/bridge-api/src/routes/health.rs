//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct Health {
    pub status: String,
    pub gateway_connected: bool,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        gateway_connected: state.gateway.is_connected(),
    })
}
