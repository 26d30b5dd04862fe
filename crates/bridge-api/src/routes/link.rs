//! Linking flow routes.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use bridge::LinkState;

use crate::error::Result;
use crate::state::{AppState, UserId};

/// Link status payload.
#[derive(Serialize)]
pub struct LinkStatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_masked: Option<String>,
}

impl From<LinkState> for LinkStatusResponse {
    fn from(state: LinkState) -> Self {
        match state {
            LinkState::NotLinked => Self {
                status: "not_linked",
                phone_masked: None,
            },
            LinkState::Pending => Self {
                status: "pending",
                phone_masked: None,
            },
            LinkState::Connected { phone_masked } => Self {
                status: "connected",
                phone_masked: Some(phone_masked),
            },
            LinkState::Error => Self {
                status: "error",
                phone_masked: None,
            },
        }
    }
}

/// Start (or restart) the linking flow; responds with the QR code image.
///
/// The code is single-use and time-limited, so the response forbids caching.
pub async fn start_link(State(state): State<AppState>, user: UserId) -> Result<Response> {
    let qr = state.link.start_link(&user.0).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        qr,
    )
        .into_response())
}

/// Poll the linking state.
pub async fn link_status(
    State(state): State<AppState>,
    user: UserId,
) -> Result<Json<LinkStatusResponse>> {
    let link_state = state.link.poll_link_status(&user.0).await?;
    Ok(Json(link_state.into()))
}
