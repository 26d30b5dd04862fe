//! Conflict banner routes.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use bridge_store::banner;

use crate::error::Result;
use crate::routes::connection::OkResponse;
use crate::state::{AppState, UserId};

/// Banner payload.
#[derive(Serialize)]
pub struct BannerResponse {
    pub id: i64,
    pub message: String,
    pub created_at: String,
}

/// List the caller's undismissed banners.
pub async fn list_banners(
    State(state): State<AppState>,
    user: UserId,
) -> Result<Json<Vec<BannerResponse>>> {
    let banners = banner::list_active(state.db.pool(), &user.0).await?;

    Ok(Json(
        banners
            .into_iter()
            .map(|b| BannerResponse {
                id: b.id,
                message: b.message,
                created_at: b.created_at,
            })
            .collect(),
    ))
}

/// Dismiss a banner. Idempotent.
pub async fn dismiss_banner(
    State(state): State<AppState>,
    _user: UserId,
    Path(banner_id): Path<i64>,
) -> Result<Json<OkResponse>> {
    banner::dismiss(state.db.pool(), banner_id).await?;
    Ok(Json(OkResponse { ok: true }))
}
