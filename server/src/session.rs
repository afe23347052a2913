//! Explicit per-session client state.
//!
//! Replaces the original ambient provider: a `SessionContext` is created
//! when a client session starts, passed explicitly to the components that
//! need it, and dropped on logout or tab close.

use parking_lot::RwLock;

use crate::task::TaskStatus;

/// Sidebar summary of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    /// Task id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Last known status.
    pub status: TaskStatus,
}

#[derive(Debug, Default)]
struct SessionInner {
    current_task: Option<String>,
    recent_tasks: Vec<TaskSummary>,
}

/// Application state for one client session.
#[derive(Debug)]
pub struct SessionContext {
    session_id: String,
    inner: RwLock<SessionInner>,
}

const RECENT_TASKS_CAP: usize = 50;

impl SessionContext {
    /// Creates the context at session start.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            inner: RwLock::new(SessionInner::default()),
        }
    }

    /// The anonymous session id.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Task the client is currently viewing, if any.
    #[must_use]
    pub fn current_task(&self) -> Option<String> {
        self.inner.read().current_task.clone()
    }

    /// Sets or clears the currently viewed task.
    pub fn set_current_task(&self, task_id: Option<String>) {
        self.inner.write().current_task = task_id;
    }

    /// Sidebar list, most recent first.
    #[must_use]
    pub fn recent_tasks(&self) -> Vec<TaskSummary> {
        self.inner.read().recent_tasks.clone()
    }

    /// Records a task in the sidebar list, moving it to the front and
    /// refreshing its title/status if already present.
    pub fn remember_task(&self, summary: TaskSummary) {
        let mut inner = self.inner.write();
        inner.recent_tasks.retain(|t| t.id != summary.id);
        inner.recent_tasks.insert(0, summary);
        inner.recent_tasks.truncate(RECENT_TASKS_CAP);
    }

    /// Clears all session state (logout / teardown).
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.current_task = None;
        inner.recent_tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, status: TaskStatus) -> TaskSummary {
        TaskSummary {
            id: id.to_string(),
            title: format!("task {id}"),
            status,
        }
    }

    #[test]
    fn remember_task_moves_existing_entry_to_front() {
        let ctx = SessionContext::new("s1");
        ctx.remember_task(summary("a", TaskStatus::Pending));
        ctx.remember_task(summary("b", TaskStatus::Pending));
        ctx.remember_task(summary("a", TaskStatus::Completed));

        let recent = ctx.recent_tasks();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, "a");
        assert_eq!(recent[0].status, TaskStatus::Completed);
        assert_eq!(recent[1].id, "b");
    }

    #[test]
    fn clear_drops_all_state() {
        let ctx = SessionContext::new("s1");
        ctx.set_current_task(Some("a".to_string()));
        ctx.remember_task(summary("a", TaskStatus::Pending));

        ctx.clear();
        assert_eq!(ctx.current_task(), None);
        assert!(ctx.recent_tasks().is_empty());
        assert_eq!(ctx.session_id(), "s1");
    }
}
