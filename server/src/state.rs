//! Shared application state for request handlers.

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::sync::Arc;

use crate::backend::WorkerBackend;
use crate::conversation::ConversationStore;
use crate::task::{TaskLifecycle, TaskStore};

struct AppStateInner {
    tasks: TaskLifecycle,
    conversations: ConversationStore,
    backend: Arc<dyn WorkerBackend>,
}

/// Application state handed to every handler. Cheap to clone via an
/// internal `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Connects to the database and bootstraps the stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema bootstrap fails.
    pub async fn new(db_url: &str, backend: Arc<dyn WorkerBackend>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .connect(db_url)
            .await
            .context("failed to connect to database")?;
        Self::with_pool(pool, backend).await
    }

    /// Builds state over an existing pool (used by tests with in-memory
    /// SQLite, where the pool must be single-connection).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema bootstrap fails.
    pub async fn with_pool(pool: SqlitePool, backend: Arc<dyn WorkerBackend>) -> Result<Self> {
        let task_store = TaskStore::new(pool.clone());
        task_store.init().await.context("task schema bootstrap")?;
        let conversations = ConversationStore::new(pool);
        conversations
            .init()
            .await
            .context("conversation schema bootstrap")?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                tasks: TaskLifecycle::new(task_store, backend.clone()),
                conversations,
                backend,
            }),
        })
    }

    /// Task lifecycle service.
    #[must_use]
    pub fn tasks(&self) -> &TaskLifecycle {
        &self.inner.tasks
    }

    /// Conversation store.
    #[must_use]
    pub fn conversations(&self) -> &ConversationStore {
        &self.inner.conversations
    }

    /// External worker backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn WorkerBackend> {
        &self.inner.backend
    }
}
