//! Route handlers for the bridge HTTP surface.

pub mod banners;
pub mod connection;
pub mod health;
pub mod link;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Linking flow
        .route("/api/signal/link", post(link::start_link))
        .route("/api/signal/link/status", get(link::link_status))
        // Connection + preferences
        .route(
            "/api/signal/connection",
            get(connection::get_connection).delete(connection::disconnect),
        )
        .route(
            "/api/signal/preferences",
            get(connection::get_preferences).put(connection::set_preferences),
        )
        // Conflict banners
        .route("/api/signal/banners", get(banners::list_banners))
        .route("/api/signal/banners/:id/dismiss", post(banners::dismiss_banner))
        // Called by the chat service when it creates assistant/system messages
        .route("/internal/signal/deliver", post(connection::deliver))
}
