//! REST API endpoints for the task lifecycle.

pub mod handlers;
pub mod routes;
pub mod types;

pub use routes::routes;
pub use types::{
    CallbackResponse, CreateTaskRequest, CreatedTaskEnvelope, CreatedTaskResponse, ListTasksQuery,
    PatchTaskRequest, StartProgressQuery, TaskEnvelope, TaskListEnvelope,
};
