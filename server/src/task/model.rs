//! Task record and patch types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::TaskStatus;

/// A single report-generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier (UUID, server-generated).
    pub id: String,
    /// Human-readable title. May be empty until the asynchronous
    /// title-generation step fills it in.
    pub title: String,
    /// Owning authenticated user, if any.
    pub user_id: Option<String>,
    /// Owning anonymous session, if any.
    pub session_id: Option<String>,
    /// Lifecycle status. Single source of truth for client routing.
    pub status: TaskStatus,
    /// Open key-value payload; contains at minimum the `topic`.
    pub params: Value,
    /// Structured plan returned by the external planner. Set once.
    pub stages: Option<Value>,
    /// Free-form auxiliary data.
    pub metadata: Value,
    /// Final payload; populated iff `status == completed`.
    pub results: Option<Value>,
    /// Creation timestamp, server-managed.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp, server-managed.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// The `topic` value out of `params`, if present.
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.params.get("topic").and_then(Value::as_str)
    }
}

/// Fields for creating a task. The id, status and timestamps are
/// server-generated.
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Initial title (usually empty).
    pub title: String,
    /// Owning user, if authenticated.
    pub user_id: Option<String>,
    /// Owning anonymous session.
    pub session_id: Option<String>,
    /// Initial params payload.
    pub params: Value,
}

/// Partial update applied to a task in a single atomic statement.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    /// Replace the title.
    pub title: Option<String>,
    /// Replace the params payload.
    pub params: Option<Value>,
    /// Requested status change; validated against the transition table.
    pub status: Option<TaskStatus>,
    /// Set the planner stages.
    pub stages: Option<Value>,
    /// Replace the metadata payload.
    pub metadata: Option<Value>,
    /// Set the final results payload.
    pub results: Option<Value>,
}

/// Owner identity used for list filtering and privileged transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOwner {
    /// Authenticated user id.
    User(String),
    /// Anonymous session id.
    Session(String),
}

impl TaskOwner {
    /// Whether this identity owns the given task.
    #[must_use]
    pub fn owns(&self, task: &Task) -> bool {
        match self {
            TaskOwner::User(id) => task.user_id.as_deref() == Some(id.as_str()),
            TaskOwner::Session(id) => task.session_id.as_deref() == Some(id.as_str()),
        }
    }
}
