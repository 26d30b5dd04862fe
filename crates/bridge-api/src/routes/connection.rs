//! Connection, preference and delivery routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use bridge::ChatMessage;
use bridge_store::{connection, NotificationMode};

use crate::error::{ApiError, Result};
use crate::state::{AppState, UserId};

/// Connection summary payload.
#[derive(Serialize)]
pub struct ConnectionResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_masked: Option<String>,
    pub notification_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_project: Option<String>,
}

/// Get the caller's connection, or 404 when not linked.
pub async fn get_connection(
    State(state): State<AppState>,
    user: UserId,
) -> Result<Json<ConnectionResponse>> {
    let info = state
        .link
        .connection_info(&user.0)
        .await?
        .ok_or(ApiError::NotLinked)?;

    Ok(Json(ConnectionResponse {
        status: info.status.as_str(),
        phone_masked: info.phone_masked,
        notification_mode: info.notification_mode.as_str(),
        last_active_project: info.last_active_project,
    }))
}

#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Disconnect the caller's link. Idempotent.
pub async fn disconnect(State(state): State<AppState>, user: UserId) -> Result<Json<OkResponse>> {
    state.link.disconnect(&user.0).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// Preference payload.
#[derive(Serialize)]
pub struct PreferencesResponse {
    pub notification_mode: &'static str,
}

#[derive(Deserialize)]
pub struct SetPreferencesRequest {
    pub notification_mode: String,
}

/// Get the caller's notification mode.
pub async fn get_preferences(
    State(state): State<AppState>,
    user: UserId,
) -> Result<Json<PreferencesResponse>> {
    let row = connection::get_by_user(state.db.pool(), &user.0)
        .await?
        .ok_or(ApiError::NotLinked)?;

    Ok(Json(PreferencesResponse {
        notification_mode: row.notification_mode().as_str(),
    }))
}

/// Set the caller's notification mode; responds with the stored mode.
pub async fn set_preferences(
    State(state): State<AppState>,
    user: UserId,
    Json(request): Json<SetPreferencesRequest>,
) -> Result<Json<PreferencesResponse>> {
    let mode = NotificationMode::parse(&request.notification_mode).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "unknown notification mode: {}",
            request.notification_mode
        ))
    })?;

    state.link.set_notification_mode(&user.0, mode).await?;

    Ok(Json(PreferencesResponse {
        notification_mode: mode.as_str(),
    }))
}

#[derive(Serialize)]
pub struct DeliverResponse {
    pub accepted: bool,
}

/// Queue Signal delivery for a freshly created chat message.
///
/// Fire-and-forget: responds 202 immediately; filtering, retries and
/// failures all happen in the background task and are never surfaced here.
pub async fn deliver(
    State(state): State<AppState>,
    Json(message): Json<ChatMessage>,
) -> (StatusCode, Json<DeliverResponse>) {
    let _ = state.delivery.deliver(message);
    (StatusCode::ACCEPTED, Json(DeliverResponse { accepted: true }))
}
