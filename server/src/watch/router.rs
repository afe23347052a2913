//! Status-driven view routing.
//!
//! The mapping from task status to view route is pure and total: every
//! string, including unrecognized statuses, maps to a route. The reactor
//! wrapper suppresses redundant navigation.

use crate::task::TaskStatus;

/// Where to send a task whose run has failed.
///
/// The reference behavior routes failures back to the editable form, which
/// is ambiguous with a fresh task; `ErrorView` gives failures a distinct
/// route instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailedRouting {
    /// Fall back to the editable form (reference behavior).
    #[default]
    Form,
    /// Route to a dedicated error view.
    ErrorView,
}

/// Computes the view route for a task id and raw status string.
///
/// Total: unknown statuses fall back to the base form route.
#[must_use]
pub fn route_for_status(task_id: &str, status: &str, failed: FailedRouting) -> String {
    match TaskStatus::parse(status) {
        Some(TaskStatus::Stage) => format!("/agents/{task_id}/stage"),
        Some(TaskStatus::InProgress) => format!("/agents/{task_id}/progress"),
        Some(TaskStatus::Completed) => format!("/agents/{task_id}/report"),
        Some(TaskStatus::Failed) => match failed {
            FailedRouting::Form => format!("/agents/{task_id}"),
            FailedRouting::ErrorView => format!("/agents/{task_id}/error"),
        },
        Some(TaskStatus::Pending) | None => format!("/agents/{task_id}"),
    }
}

/// Reactive router for one task's views.
///
/// Re-evaluates only when the observed status changes, and never yields a
/// navigation to the route the client is already on.
#[derive(Debug)]
pub struct RouteReactor {
    task_id: String,
    failed: FailedRouting,
    last_status: Option<String>,
    current_route: Option<String>,
}

impl RouteReactor {
    /// Creates a reactor for a task.
    #[must_use]
    pub fn new(task_id: impl Into<String>, failed: FailedRouting) -> Self {
        Self {
            task_id: task_id.into(),
            failed,
            last_status: None,
            current_route: None,
        }
    }

    /// Feeds an observed status. Returns the route to navigate to, or
    /// `None` when no navigation is needed.
    pub fn observe(&mut self, status: &str) -> Option<String> {
        if self.last_status.as_deref() == Some(status) {
            return None;
        }
        self.last_status = Some(status.to_string());

        let target = route_for_status(&self.task_id, status, self.failed);
        if self.current_route.as_deref() == Some(target.as_str()) {
            return None;
        }
        self.current_route = Some(target.clone());
        Some(target)
    }

    /// Route the client is currently on, if any status has been observed.
    #[must_use]
    pub fn current_route(&self) -> Option<&str> {
        self.current_route.as_deref()
    }
}
