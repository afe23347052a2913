//! Fixed-interval status polling with cancellation.
//!
//! The poller fetches a task's status on a fixed interval, forwards every
//! observation to the caller, stops on the first terminal status, and can be
//! cancelled through a watch channel so teardown leaves no orphaned timer.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::task::TaskStatus;

/// Reference polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Errors while polling for a task's status.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Task does not exist on the server.
    #[error("task not found: {0}")]
    NotFound(String),
    /// Transport or protocol failure.
    #[error("status request failed: {0}")]
    Request(String),
}

/// Source of a task's current status string.
#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    /// Fetches the raw status for a task.
    async fn fetch_status(&self, task_id: &str) -> Result<String, WatchError>;
}

/// [`TaskStatusSource`] backed by `GET /api/task/{id}`.
pub struct HttpStatusSource {
    client: Client,
    base_url: Url,
}

impl HttpStatusSource {
    /// Creates a source against a server base URL.
    ///
    /// # Errors
    ///
    /// Returns `Request` if the base URL fails to parse.
    pub fn new(base_url: &str) -> Result<Self, WatchError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(&normalized)
                .map_err(|e| WatchError::Request(format!("invalid base URL: {e}")))?,
        })
    }
}

#[async_trait]
impl TaskStatusSource for HttpStatusSource {
    async fn fetch_status(&self, task_id: &str) -> Result<String, WatchError> {
        let url = self
            .base_url
            .join(&format!("api/task/{task_id}"))
            .map_err(|e| WatchError::Request(e.to_string()))?;

        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WatchError::Request(e.to_string()))?;

        if res.status() == StatusCode::NOT_FOUND {
            return Err(WatchError::NotFound(task_id.to_string()));
        }
        if !res.status().is_success() {
            return Err(WatchError::Request(format!("status {}", res.status())));
        }

        let body: Value = res
            .json()
            .await
            .map_err(|e| WatchError::Request(e.to_string()))?;
        body.get("task")
            .and_then(|t| t.get("status"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| WatchError::Request("response missing task.status".to_string()))
    }
}

/// Polls a task until it reaches a terminal status or is cancelled.
pub struct TaskPoller {
    source: Arc<dyn TaskStatusSource>,
    interval: Duration,
}

impl TaskPoller {
    /// Creates a poller with the reference 5-second interval.
    #[must_use]
    pub fn new(source: Arc<dyn TaskStatusSource>) -> Self {
        Self {
            source,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the polling interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs the polling loop.
    ///
    /// Each observed status string is passed to `on_status` (the route
    /// reactor hooks in here). Returns the terminal status once observed,
    /// or `None` if cancelled first. Cancellation is signalled by sending
    /// `true` on the watch channel; dropping the sender also cancels.
    ///
    /// # Errors
    ///
    /// Returns the first fetch error; the loop does not retry.
    pub async fn run(
        &self,
        task_id: &str,
        mut cancel: watch::Receiver<bool>,
        mut on_status: impl FnMut(&str) + Send,
    ) -> Result<Option<TaskStatus>, WatchError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let status = self.source.fetch_status(task_id).await?;
                    debug!(task_id, %status, "poll observed status");
                    on_status(&status);
                    if let Some(parsed) = TaskStatus::parse(&status) {
                        if parsed.is_terminal() {
                            return Ok(Some(parsed));
                        }
                    }
                }
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        debug!(task_id, "polling cancelled");
                        return Ok(None);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct ScriptedSource {
        statuses: Mutex<VecDeque<&'static str>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(statuses: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl TaskStatusSource for ScriptedSource {
        async fn fetch_status(&self, _task_id: &str) -> Result<String, WatchError> {
            *self.calls.lock() += 1;
            let status = self
                .statuses
                .lock()
                .pop_front()
                .unwrap_or("in_progress");
            Ok(status.to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_once_per_interval_until_terminal_then_stops() {
        let source = ScriptedSource::new(&["pending", "in_progress", "in_progress", "completed"]);
        let poller = TaskPoller::new(source.clone()).with_interval(Duration::from_secs(5));
        let (_tx, rx) = watch::channel(false);

        let mut seen = Vec::new();
        let outcome = poller
            .run("t1", rx, |status| seen.push(status.to_string()))
            .await
            .unwrap();

        assert_eq!(outcome, Some(TaskStatus::Completed));
        assert_eq!(source.calls(), 4);
        assert_eq!(seen, ["pending", "in_progress", "in_progress", "completed"]);

        // The loop has returned, so no further request can fire.
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_terminates_polling() {
        let source = ScriptedSource::new(&["in_progress", "failed"]);
        let poller = TaskPoller::new(source.clone()).with_interval(Duration::from_secs(5));
        let (_tx, rx) = watch::channel(false);

        let outcome = poller.run("t1", rx, |_| {}).await.unwrap();
        assert_eq!(outcome, Some(TaskStatus::Failed));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop() {
        let source = ScriptedSource::new(&[]);
        let poller = TaskPoller::new(source.clone()).with_interval(Duration::from_secs(5));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { poller.run("t1", rx, |_| {}).await });

        // Let a few polls happen, then cancel.
        tokio::time::sleep(Duration::from_secs(12)).await;
        tx.send(true).unwrap();

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome, None);

        let calls_at_cancel = source.calls();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(source.calls(), calls_at_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_cancel_sender_stops_the_loop() {
        let source = ScriptedSource::new(&[]);
        let poller = TaskPoller::new(source.clone()).with_interval(Duration::from_secs(5));
        let (tx, rx) = watch::channel(false);
        drop(tx);

        let outcome = poller.run("t1", rx, |_| {}).await.unwrap();
        assert_eq!(outcome, None);
    }
}
