//! SQLite-backed task store.
//!
//! Every mutation is a single SQL statement; concurrent writers rely on the
//! database for mutual exclusion, never on read-then-write sequences.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::instrument;

use super::model::{NewTask, Task, TaskOwner, TaskPatch};
use super::status::TaskStatus;

/// Errors that can occur when using the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Database-level error.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    /// Internal error (corrupt row, bad stored payload).
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Persistent store for [`Task`] rows.
#[derive(Debug, Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the `tasks` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statement fails.
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                user_id TEXT,
                session_id TEXT,
                status TEXT NOT NULL,
                params TEXT NOT NULL,
                stages TEXT,
                metadata TEXT NOT NULL,
                results TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts a new task with a server-generated id and `pending` status.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    #[instrument(skip(self, fields))]
    pub async fn create(&self, fields: NewTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: fields.title,
            user_id: fields.user_id,
            session_id: fields.session_id,
            status: TaskStatus::Pending,
            params: fields.params,
            stages: None,
            metadata: Value::Object(serde_json::Map::new()),
            results: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO tasks (id, title, user_id, session_id, status, params, stages, metadata, results, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&task.id)
        .bind(&task.title)
        .bind(&task.user_id)
        .bind(&task.session_id)
        .bind(task.status.as_str())
        .bind(task.params.to_string())
        .bind(task.stages.as_ref().map(Value::to_string))
        .bind(task.metadata.to_string())
        .bind(task.results.as_ref().map(Value::to_string))
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(task)
    }

    /// Fetches a task by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row exists for the id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Task, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        task_from_row(&row)
    }

    /// Applies a partial update as one atomic `UPDATE` statement.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row exists for the id. No transition
    /// validation happens here; callers go through the lifecycle service.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: &TaskPatch) -> Result<Task, StoreError> {
        let mut sets: Vec<&str> = vec!["updated_at = ?"];
        let mut binds: Vec<String> = vec![Utc::now().to_rfc3339()];

        if let Some(title) = &patch.title {
            sets.push("title = ?");
            binds.push(title.clone());
        }
        if let Some(params) = &patch.params {
            sets.push("params = ?");
            binds.push(params.to_string());
        }
        if let Some(status) = patch.status {
            sets.push("status = ?");
            binds.push(status.as_str().to_string());
        }
        if let Some(stages) = &patch.stages {
            sets.push("stages = ?");
            binds.push(stages.to_string());
        }
        if let Some(metadata) = &patch.metadata {
            sets.push("metadata = ?");
            binds.push(metadata.to_string());
        }
        if let Some(results) = &patch.results {
            sets.push("results = ?");
            binds.push(results.to_string());
        }

        let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        let result = query.bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.get(id).await
    }

    /// Lists tasks belonging to an owner, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, owner: &TaskOwner) -> Result<Vec<Task>, StoreError> {
        let (column, value) = match owner {
            TaskOwner::User(id) => ("user_id", id),
            TaskOwner::Session(id) => ("session_id", id),
        };
        let sql = format!("SELECT * FROM tasks WHERE {column} = ? ORDER BY created_at DESC");
        let rows = sqlx::query(&sql).bind(value).fetch_all(&self.pool).await?;
        rows.iter().map(task_from_row).collect()
    }
}

fn task_from_row(row: &SqliteRow) -> Result<Task, StoreError> {
    let status_raw: String = row.try_get("status")?;
    let status = TaskStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Internal(anyhow!("unknown stored status: {status_raw}")))?;

    Ok(Task {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        user_id: row.try_get("user_id")?,
        session_id: row.try_get("session_id")?,
        status,
        params: parse_json(row.try_get("params")?)?,
        stages: parse_json_opt(row.try_get("stages")?)?,
        metadata: parse_json(row.try_get("metadata")?)?,
        results: parse_json_opt(row.try_get("results")?)?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn parse_json(raw: String) -> Result<Value, StoreError> {
    serde_json::from_str(&raw).map_err(|e| StoreError::Internal(anyhow!("bad stored JSON: {e}")))
}

fn parse_json_opt(raw: Option<String>) -> Result<Option<Value>, StoreError> {
    raw.map(parse_json).transpose()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| StoreError::Internal(anyhow!("bad stored timestamp '{raw}': {e}")))
}
