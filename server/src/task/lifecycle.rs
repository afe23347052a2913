//! Task lifecycle service.
//!
//! All status mutations funnel through here: patches are validated against
//! the transition table, `start_progress` couples the STAGE -> IN_PROGRESS
//! write with the worker dispatch (compensating to FAILED when dispatch
//! fails), and worker callbacks are applied idempotently.

use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::model::{NewTask, Task, TaskOwner, TaskPatch};
use super::status::{InvalidTransition, TaskStatus};
use super::store::{StoreError, TaskStore};
use crate::backend::{BackendError, WorkerBackend};

/// Errors from lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Storage failure or missing task.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Requested status change violates the transition table.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    /// Worker dispatch failed; the task was compensated to `failed`.
    #[error("worker dispatch failed: {0}")]
    Dispatch(#[from] BackendError),
    /// Caller did not supply an owning identity, or the identity does not
    /// own the task.
    #[error("owning user or session identity required")]
    Unauthorized,
    /// Callback payload is not a recognized worker result.
    #[error("invalid callback payload: {0}")]
    BadCallback(String),
}

/// Terminal signal carried by a worker callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackSignal {
    /// Generation finished; `results` must be present.
    Completed,
    /// Planning or generation failed.
    Failed,
}

/// Payload posted by the external worker to the callback endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackPayload {
    /// Terminal signal.
    pub status: CallbackSignal,
    /// Final results; required when `status == completed`.
    #[serde(default)]
    pub results: Option<Value>,
    /// Worker-side error description, when failed.
    #[serde(default)]
    pub error: Option<String>,
}

/// How a callback landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The terminal status (and results) were written.
    Applied,
    /// The task was already terminal with an identical result; nothing
    /// was written.
    Replayed,
}

/// Service coordinating task state with the external worker.
pub struct TaskLifecycle {
    store: TaskStore,
    backend: Arc<dyn WorkerBackend>,
}

impl TaskLifecycle {
    /// Creates the service over a store and a worker backend.
    #[must_use]
    pub fn new(store: TaskStore, backend: Arc<dyn WorkerBackend>) -> Self {
        Self { store, backend }
    }

    /// Creates a task in `pending` status.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create(&self, fields: NewTask) -> Result<Task, TaskError> {
        let task = self.store.create(fields).await?;
        counter!("camus_tasks_created_total").increment(1);
        Ok(task)
    }

    /// Fetches a task by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the task does not exist.
    pub async fn get(&self, id: &str) -> Result<Task, TaskError> {
        Ok(self.store.get(id).await?)
    }

    /// Lists an owner's tasks, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, owner: &TaskOwner) -> Result<Vec<Task>, TaskError> {
        Ok(self.store.list(owner).await?)
    }

    /// Applies a client patch. Status changes are validated against the
    /// transition table; terminal tasks reject any status mutation.
    ///
    /// # Errors
    ///
    /// Returns `Transition` for illegal status changes, `Store` otherwise.
    #[instrument(skip(self, patch))]
    pub async fn apply_patch(&self, id: &str, patch: TaskPatch) -> Result<Task, TaskError> {
        if let Some(to) = patch.status {
            let current = self.store.get(id).await?;
            current.status.validate_transition(to)?;
            record_transition(current.status, to);
        }
        Ok(self.store.update(id, &patch).await?)
    }

    /// Privileged STAGE -> IN_PROGRESS transition plus worker dispatch.
    ///
    /// The status write commits first; if the dispatch then fails, the task
    /// is compensated to `failed` so it is never left in progress with no
    /// worker attached.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without a matching owner identity, `Transition` when
    /// the task is not in `stage`, `Dispatch` when the worker call fails.
    #[instrument(skip(self, owner, patch))]
    pub async fn start_progress(
        &self,
        id: &str,
        owner: Option<TaskOwner>,
        mut patch: TaskPatch,
    ) -> Result<Task, TaskError> {
        let owner = owner.ok_or(TaskError::Unauthorized)?;
        let current = self.store.get(id).await?;
        if !owner.owns(&current) {
            return Err(TaskError::Unauthorized);
        }

        current
            .status
            .validate_transition(TaskStatus::InProgress)?;
        patch.status = Some(TaskStatus::InProgress);
        let task = self.store.update(id, &patch).await?;
        record_transition(current.status, TaskStatus::InProgress);

        if let Err(dispatch_err) = self.backend.dispatch(&task).await {
            warn!(task_id = %id, error = %dispatch_err, "dispatch failed, compensating to failed");
            let compensation = TaskPatch {
                status: Some(TaskStatus::Failed),
                ..TaskPatch::default()
            };
            if let Err(store_err) = self.store.update(id, &compensation).await {
                warn!(task_id = %id, error = %store_err, "compensation write failed");
            } else {
                record_transition(TaskStatus::InProgress, TaskStatus::Failed);
            }
            return Err(TaskError::Dispatch(dispatch_err));
        }

        info!(task_id = %id, "generation dispatched");
        Ok(task)
    }

    /// Applies a worker callback. Idempotent: replaying an identical
    /// terminal result is a no-op that still reports success.
    ///
    /// # Errors
    ///
    /// `BadCallback` when a completed signal carries no results,
    /// `Transition` when the signal conflicts with the task's state.
    #[instrument(skip(self, payload))]
    pub async fn apply_callback(
        &self,
        id: &str,
        payload: CallbackPayload,
    ) -> Result<CallbackOutcome, TaskError> {
        let target = match payload.status {
            CallbackSignal::Completed => TaskStatus::Completed,
            CallbackSignal::Failed => TaskStatus::Failed,
        };
        if target == TaskStatus::Completed && payload.results.is_none() {
            return Err(TaskError::BadCallback(
                "completed callback without results".to_string(),
            ));
        }
        // Results only exist on completed tasks; anything a failure carries
        // is dropped before it can reach storage.
        let results = if target == TaskStatus::Completed {
            payload.results
        } else {
            None
        };

        let current = self.store.get(id).await?;

        if current.status.is_terminal() {
            if current.status == target && current.results == results {
                counter!("camus_callback_replays_total").increment(1);
                info!(task_id = %id, status = %target, "terminal callback replayed, ignoring");
                return Ok(CallbackOutcome::Replayed);
            }
            warn!(task_id = %id, from = %current.status, to = %target, "conflicting callback against terminal task");
            return Err(TaskError::Transition(InvalidTransition {
                from: current.status,
                to: target,
            }));
        }

        current.status.validate_transition(target)?;

        if let Some(error) = &payload.error {
            warn!(task_id = %id, error = %error, "worker reported failure");
        }

        let patch = TaskPatch {
            status: Some(target),
            results,
            ..TaskPatch::default()
        };
        self.store.update(id, &patch).await?;
        record_transition(current.status, target);
        Ok(CallbackOutcome::Applied)
    }
}

fn record_transition(from: TaskStatus, to: TaskStatus) {
    counter!(
        "camus_task_transitions_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

impl std::fmt::Debug for TaskLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLifecycle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PlanUpstreamRequest;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    #[derive(Default)]
    struct MockBackend {
        fail_dispatch: bool,
        dispatched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WorkerBackend for MockBackend {
        async fn plan(&self, _request: PlanUpstreamRequest) -> Result<Value, BackendError> {
            Ok(json!({"stages": []}))
        }

        async fn dispatch(&self, task: &Task) -> Result<(), BackendError> {
            if self.fail_dispatch {
                return Err(BackendError::Network("connection refused".to_string()));
            }
            self.dispatched.lock().push(task.id.clone());
            Ok(())
        }
    }

    async fn lifecycle(backend: MockBackend) -> (TaskLifecycle, Arc<MockBackend>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = TaskStore::new(pool);
        store.init().await.unwrap();
        let backend = Arc::new(backend);
        (TaskLifecycle::new(store, backend.clone()), backend)
    }

    fn new_task() -> NewTask {
        NewTask {
            title: String::new(),
            user_id: None,
            session_id: Some("s1".to_string()),
            params: json!({"topic": "T"}),
        }
    }

    fn owner() -> Option<TaskOwner> {
        Some(TaskOwner::Session("s1".to_string()))
    }

    async fn staged_task(lc: &TaskLifecycle) -> Task {
        let task = lc.create(new_task()).await.unwrap();
        lc.apply_patch(
            &task.id,
            TaskPatch {
                status: Some(TaskStatus::Stage),
                stages: Some(json!({"steps": ["plan"]})),
                ..TaskPatch::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn patch_rejects_illegal_transition() {
        let (lc, _) = lifecycle(MockBackend::default()).await;
        let task = lc.create(new_task()).await.unwrap();

        let err = lc
            .apply_patch(
                &task.id,
                TaskPatch {
                    status: Some(TaskStatus::Completed),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Transition(_)));

        // Task untouched.
        assert_eq!(lc.get(&task.id).await.unwrap().status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn start_progress_transitions_and_dispatches() {
        let (lc, backend) = lifecycle(MockBackend::default()).await;
        let task = staged_task(&lc).await;

        let started = lc
            .start_progress(&task.id, owner(), TaskPatch::default())
            .await
            .unwrap();

        assert_eq!(started.status, TaskStatus::InProgress);
        assert_eq!(backend.dispatched.lock().as_slice(), [task.id.clone()]);
    }

    #[tokio::test]
    async fn start_progress_requires_owner_identity() {
        let (lc, backend) = lifecycle(MockBackend::default()).await;
        let task = staged_task(&lc).await;

        let err = lc
            .start_progress(&task.id, None, TaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Unauthorized));

        let err = lc
            .start_progress(
                &task.id,
                Some(TaskOwner::Session("someone-else".to_string())),
                TaskPatch::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Unauthorized));

        assert!(backend.dispatched.lock().is_empty());
        assert_eq!(lc.get(&task.id).await.unwrap().status, TaskStatus::Stage);
    }

    #[tokio::test]
    async fn start_progress_compensates_to_failed_on_dispatch_error() {
        let (lc, _) = lifecycle(MockBackend {
            fail_dispatch: true,
            ..MockBackend::default()
        })
        .await;
        let task = staged_task(&lc).await;

        let err = lc
            .start_progress(&task.id, owner(), TaskPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Dispatch(_)));

        // Never left stuck in stage or in_progress with no worker.
        assert_eq!(lc.get(&task.id).await.unwrap().status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn callback_completes_task_with_results() {
        let (lc, _) = lifecycle(MockBackend::default()).await;
        let task = staged_task(&lc).await;
        lc.start_progress(&task.id, owner(), TaskPatch::default())
            .await
            .unwrap();

        let results = json!({"artifacts": [{"url": "u", "filename": "f", "filetype": "pdf"}]});
        let outcome = lc
            .apply_callback(
                &task.id,
                CallbackPayload {
                    status: CallbackSignal::Completed,
                    results: Some(results.clone()),
                    error: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::Applied);

        let done = lc.get(&task.id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.results, Some(results));
    }

    #[tokio::test]
    async fn callback_replay_is_idempotent() {
        let (lc, _) = lifecycle(MockBackend::default()).await;
        let task = staged_task(&lc).await;
        lc.start_progress(&task.id, owner(), TaskPatch::default())
            .await
            .unwrap();

        let payload = CallbackPayload {
            status: CallbackSignal::Completed,
            results: Some(json!({"report": "r"})),
            error: None,
        };
        lc.apply_callback(&task.id, payload.clone()).await.unwrap();
        let snapshot = lc.get(&task.id).await.unwrap();

        let outcome = lc.apply_callback(&task.id, payload).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Replayed);

        let after = lc.get(&task.id).await.unwrap();
        assert_eq!(after.status, snapshot.status);
        assert_eq!(after.results, snapshot.results);
        assert_eq!(after.updated_at, snapshot.updated_at);
    }

    #[tokio::test]
    async fn conflicting_callback_against_terminal_task_is_rejected() {
        let (lc, _) = lifecycle(MockBackend::default()).await;
        let task = staged_task(&lc).await;
        lc.start_progress(&task.id, owner(), TaskPatch::default())
            .await
            .unwrap();
        lc.apply_callback(
            &task.id,
            CallbackPayload {
                status: CallbackSignal::Completed,
                results: Some(json!({"report": "r"})),
                error: None,
            },
        )
        .await
        .unwrap();

        let err = lc
            .apply_callback(
                &task.id,
                CallbackPayload {
                    status: CallbackSignal::Failed,
                    results: None,
                    error: Some("late failure".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Transition(_)));
        assert_eq!(
            lc.get(&task.id).await.unwrap().status,
            TaskStatus::Completed
        );
    }

    #[tokio::test]
    async fn completed_callback_without_results_is_rejected() {
        let (lc, _) = lifecycle(MockBackend::default()).await;
        let task = staged_task(&lc).await;
        lc.start_progress(&task.id, owner(), TaskPatch::default())
            .await
            .unwrap();

        let err = lc
            .apply_callback(
                &task.id,
                CallbackPayload {
                    status: CallbackSignal::Completed,
                    results: None,
                    error: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::BadCallback(_)));
    }

    #[tokio::test]
    async fn failure_callback_never_stores_results() {
        let (lc, _) = lifecycle(MockBackend::default()).await;
        let task = staged_task(&lc).await;
        lc.start_progress(&task.id, owner(), TaskPatch::default())
            .await
            .unwrap();

        let payload = CallbackPayload {
            status: CallbackSignal::Failed,
            results: Some(json!({"partial": "junk"})),
            error: Some("worker crashed".to_string()),
        };
        let outcome = lc.apply_callback(&task.id, payload.clone()).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Applied);

        let failed = lc.get(&task.id).await.unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert!(failed.results.is_none());

        // The stray payload does not break replay idempotence either.
        let outcome = lc.apply_callback(&task.id, payload).await.unwrap();
        assert_eq!(outcome, CallbackOutcome::Replayed);
    }

    #[tokio::test]
    async fn planning_failure_callback_fails_staged_task() {
        let (lc, _) = lifecycle(MockBackend::default()).await;
        let task = staged_task(&lc).await;

        let outcome = lc
            .apply_callback(
                &task.id,
                CallbackPayload {
                    status: CallbackSignal::Failed,
                    results: None,
                    error: Some("planner exploded".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome, CallbackOutcome::Applied);
        assert_eq!(lc.get(&task.id).await.unwrap().status, TaskStatus::Failed);
        assert!(lc.get(&task.id).await.unwrap().results.is_none());
    }
}
