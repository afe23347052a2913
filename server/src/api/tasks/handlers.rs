//! Handlers for the task API.

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::tasks::types::{
    CallbackResponse, CreateTaskRequest, CreatedTaskEnvelope, ListTasksQuery, PatchTaskRequest,
    StartProgressQuery, TaskEnvelope, TaskListEnvelope,
};
use crate::backend::PlanRequest;
use crate::state::AppState;
use crate::task::{CallbackPayload, NewTask};

/// POST /api/task
///
/// Creates a task in `pending` status owned by the given session or user.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<CreatedTaskEnvelope>), ApiError> {
    if req.topic.trim().is_empty() {
        return Err(ApiError::Validation("topic is required".to_string()));
    }
    if req.session_id.is_none() && req.user_id.is_none() {
        return Err(ApiError::Validation(
            "sessionId or userId is required".to_string(),
        ));
    }

    let task = state
        .tasks()
        .create(NewTask {
            title: String::new(),
            user_id: req.user_id,
            session_id: req.session_id,
            params: json!({ "topic": req.topic }),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedTaskEnvelope { task: task.into() }),
    ))
}

/// GET /api/task
///
/// Lists the owner's tasks, most recent first.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskListEnvelope>, ApiError> {
    let owner = query.owner().ok_or(ApiError::Unauthenticated)?;
    let tasks = state.tasks().list(&owner).await?;
    Ok(Json(TaskListEnvelope { tasks }))
}

/// GET /api/task/{id}
///
/// Returns the full task; the client poller reads `task.status` from here.
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    let task = state.tasks().get(&id).await?;
    Ok(Json(TaskEnvelope { task }))
}

/// PATCH /api/task/{id}[?startProgress=true]
///
/// Applies a partial update. With `startProgress`, also performs the
/// privileged STAGE -> IN_PROGRESS transition and dispatches the worker.
pub async fn patch_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<StartProgressQuery>,
    Json(req): Json<PatchTaskRequest>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    if !req.has_recognized_fields() && !query.start_progress {
        return Err(ApiError::Validation(
            "no recognized fields in body".to_string(),
        ));
    }

    let (patch, owner) = req.split();
    let task = if query.start_progress {
        state.tasks().start_progress(&id, owner, patch).await?
    } else {
        state.tasks().apply_patch(&id, patch).await?
    };
    Ok(Json(TaskEnvelope { task }))
}

/// POST /api/task/{id}/callback
///
/// Result delivery from the external worker. Idempotent: replaying an
/// identical terminal result still reports success.
pub async fn task_callback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<CallbackPayload>,
) -> Result<Json<CallbackResponse>, ApiError> {
    state.tasks().apply_callback(&id, payload).await?;
    Ok(Json(CallbackResponse { success: true }))
}

/// POST /api/task/plan
///
/// Proxies the plan request to `{BACKEND_ENDPOINT}/report/plan` with the
/// fixed field mapping, returning the planner's response verbatim.
pub async fn plan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.topic.trim().is_empty() {
        return Err(ApiError::Validation("topic is required".to_string()));
    }
    let response = state.backend().plan(req.into()).await?;
    Ok(Json(response))
}
