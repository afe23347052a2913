//! Handlers for the conversation API.

use axum::extract::{Json, Path, State};
use std::sync::Arc;

use crate::api::conversations::types::{
    ArtifactEnvelope, MessageEnvelope, SaveArtifactRequest, SaveMessageRequest,
    UpdateArtifactRequest,
};
use crate::api::error::ApiError;
use crate::conversation::{ArtifactUpsert, MessageUpsert};
use crate::state::AppState;

/// POST /api/conversations/{id}/messages
///
/// Idempotent message save keyed on `(conversation_id, message_id)`. Two
/// writers racing on the same key converge to a single row.
pub async fn save_message(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Json(req): Json<SaveMessageRequest>,
) -> Result<Json<MessageEnvelope>, ApiError> {
    if req.id.trim().is_empty() {
        return Err(ApiError::Validation("message id is required".to_string()));
    }

    let message = state
        .conversations()
        .upsert_message(&MessageUpsert {
            conversation_id,
            id: req.id,
            role: req.role,
            content: req.content,
            is_incomplete: req.is_incomplete,
        })
        .await?;
    Ok(Json(MessageEnvelope { message }))
}

/// POST /api/conversations/{id}/artifacts
///
/// Idempotent artifact create-or-update.
pub async fn save_artifact(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Json(req): Json<SaveArtifactRequest>,
) -> Result<Json<ArtifactEnvelope>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }

    let artifact = state
        .conversations()
        .upsert_artifact(&ArtifactUpsert {
            conversation_id,
            id: req.id,
            name: req.name,
            content: req.content,
            category: req.category,
        })
        .await?;
    Ok(Json(ArtifactEnvelope { artifact }))
}

/// PUT /api/conversations/{id}/artifacts
///
/// Partial artifact update; `isPublic` toggles sharing, assigning the
/// share slug on first share.
pub async fn update_artifact(
    State(state): State<Arc<AppState>>,
    Path(_conversation_id): Path<String>,
    Json(req): Json<UpdateArtifactRequest>,
) -> Result<Json<ArtifactEnvelope>, ApiError> {
    let fields = req.field_update();
    if fields.is_empty() && req.is_public.is_none() {
        return Err(ApiError::Validation(
            "no recognized fields in body".to_string(),
        ));
    }

    let store = state.conversations();
    let mut artifact = if fields.is_empty() {
        store.get_artifact(&req.id).await?
    } else {
        store.update_artifact(&req.id, &fields).await?
    };

    artifact = match req.is_public {
        Some(true) => store.share_artifact(&req.id).await?,
        Some(false) => store.unshare_artifact(&req.id).await?,
        None => artifact,
    };

    Ok(Json(ArtifactEnvelope { artifact }))
}

/// GET /api/artifacts/{slug}
///
/// Public artifact read; every hit bumps the monotonic view counter.
pub async fn view_artifact(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<ArtifactEnvelope>, ApiError> {
    let artifact = state.conversations().record_view(&slug).await?;
    Ok(Json(ArtifactEnvelope { artifact }))
}
