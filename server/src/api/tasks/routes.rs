//! Routes for the task API.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::tasks::handlers::{
    create_task, get_task, list_tasks, patch_task, plan, task_callback,
};
use crate::state::AppState;

/// Task API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/task", post(create_task).get(list_tasks))
        .route("/api/task/plan", post(plan))
        .route("/api/task/{id}", get(get_task).patch(patch_task))
        .route("/api/task/{id}/callback", post(task_callback))
}
