//! Task lifecycle status and the transition table.
//!
//! A task moves forward through `pending -> stage -> in_progress -> completed`,
//! with `failed` reachable from `stage` or `in_progress`. Terminal statuses
//! accept no further transitions.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task created, topic not yet submitted for planning.
    #[default]
    Pending,
    /// Plan returned by the planner, awaiting user confirmation.
    Stage,
    /// External worker is generating the report.
    InProgress,
    /// Report generation finished; `results` is populated.
    Completed,
    /// Planning or generation failed.
    Failed,
}

/// A requested status change that is not in the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition: {from} -> {to}")]
pub struct InvalidTransition {
    /// Status the task currently holds.
    pub from: TaskStatus,
    /// Status the caller asked for.
    pub to: TaskStatus,
}

impl TaskStatus {
    /// Wire representation, matching the serde encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Stage => "stage",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parse a wire status. Returns `None` for unrecognized values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "stage" => Some(TaskStatus::Stage),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// Whether no further status mutation is permitted.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether `self -> to` is in the transition table.
    #[must_use]
    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        matches!(
            (self, to),
            (TaskStatus::Pending, TaskStatus::Stage)
                | (TaskStatus::Stage, TaskStatus::InProgress)
                | (TaskStatus::Stage, TaskStatus::Failed)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::InProgress, TaskStatus::Failed)
        )
    }

    /// Validate `self -> to`, rejecting anything not in the table.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] for unlisted transitions, including any
    /// transition out of a terminal status.
    pub fn validate_transition(self, to: TaskStatus) -> Result<(), InvalidTransition> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
