//! Routes for the conversation API.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::conversations::handlers::{
    save_artifact, save_message, update_artifact, view_artifact,
};
use crate::state::AppState;

/// Conversation API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/conversations/{id}/messages", post(save_message))
        .route(
            "/api/conversations/{id}/artifacts",
            post(save_artifact).put(update_artifact),
        )
        .route("/api/artifacts/{slug}", get(view_artifact))
}
