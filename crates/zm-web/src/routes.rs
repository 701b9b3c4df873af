//! Route definitions

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers::{
    api_chat, api_end_session, api_history, api_start, chat, health, index, reset, start,
};
use crate::server::AppState;

/// Create the router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Chat page
        .route("/", get(index))
        .route("/start", post(start))
        .route("/chat", post(chat))
        .route("/reset", post(reset))
        // Health check
        .route("/health", get(health))
        // JSON API
        .route("/api/start", post(api_start))
        .route("/api/chat", post(api_chat))
        .route("/api/history", get(api_history))
        .route("/api/session", delete(api_end_session))
}
