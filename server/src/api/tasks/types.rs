//! Request/response types for the task API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::{Task, TaskOwner, TaskPatch, TaskStatus};

/// Request to create a task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Anonymous session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Authenticated user id.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Survey topic.
    pub topic: String,
}

/// Envelope for a freshly created task.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedTaskEnvelope {
    /// The created task subset.
    pub task: CreatedTaskResponse,
}

/// Task subset returned on creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTaskResponse {
    /// Task id.
    pub id: String,
    /// Title (empty until generated).
    pub title: String,
    /// Topic as submitted.
    pub topic: String,
    /// Status (`pending`).
    pub status: TaskStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for CreatedTaskResponse {
    fn from(task: Task) -> Self {
        Self {
            topic: task.topic().unwrap_or_default().to_string(),
            id: task.id,
            title: task.title,
            status: task.status,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Envelope for a full task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskEnvelope {
    /// The task.
    pub task: Task,
}

/// Envelope for a task list.
#[derive(Debug, Clone, Serialize)]
pub struct TaskListEnvelope {
    /// Owner's tasks, most recent first.
    pub tasks: Vec<Task>,
}

/// Partial task update. Only listed fields are recognized.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchTaskRequest {
    /// Replace the title.
    #[serde(default)]
    pub title: Option<String>,
    /// Replace the params payload.
    #[serde(default)]
    pub params: Option<Value>,
    /// Requested status change.
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// Set the planner stages.
    #[serde(default)]
    pub stages: Option<Value>,
    /// Caller's session identity (required for `startProgress`).
    #[serde(default)]
    pub session_id: Option<String>,
    /// Caller's user identity (required for `startProgress`).
    #[serde(default)]
    pub user_id: Option<String>,
}

impl PatchTaskRequest {
    /// True when the body carries at least one recognized task field.
    #[must_use]
    pub fn has_recognized_fields(&self) -> bool {
        self.title.is_some()
            || self.params.is_some()
            || self.status.is_some()
            || self.stages.is_some()
    }

    /// Splits into the storage patch and the caller identity.
    #[must_use]
    pub fn split(self) -> (TaskPatch, Option<TaskOwner>) {
        let owner = self
            .user_id
            .map(TaskOwner::User)
            .or(self.session_id.map(TaskOwner::Session));
        let patch = TaskPatch {
            title: self.title,
            params: self.params,
            status: self.status,
            stages: self.stages,
            ..TaskPatch::default()
        };
        (patch, owner)
    }
}

/// Query flag selecting the privileged STAGE -> IN_PROGRESS path.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StartProgressQuery {
    /// When true, the patch also starts generation.
    #[serde(default, rename = "startProgress")]
    pub start_progress: bool,
}

/// Owner filter for task listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    /// Anonymous session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Authenticated user id.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ListTasksQuery {
    /// The owner identity, user taking precedence.
    #[must_use]
    pub fn owner(self) -> Option<TaskOwner> {
        self.user_id
            .map(TaskOwner::User)
            .or(self.session_id.map(TaskOwner::Session))
    }
}

/// Callback acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackResponse {
    /// Whether the callback was accepted (replays included).
    pub success: bool,
}
