//! SQLite-backed conversation store.
//!
//! Message and artifact saves are single `INSERT .. ON CONFLICT DO UPDATE`
//! statements keyed on the logical identity, so two writers racing on the
//! same key converge to one row instead of duplicating it. View counts are
//! incremented in one `UPDATE .. SET views = views + 1`.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::instrument;

use super::model::{Artifact, Message, MessageRole};
use crate::task::StoreError;

/// Fields for an idempotent message save.
#[derive(Debug, Clone)]
pub struct MessageUpsert {
    /// Conversation key half.
    pub conversation_id: String,
    /// Message key half (client-generated).
    pub id: String,
    /// Author role.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
    /// Assistant message still streaming.
    pub is_incomplete: bool,
}

/// Fields for an idempotent artifact save.
#[derive(Debug, Clone)]
pub struct ArtifactUpsert {
    /// Conversation the artifact came from.
    pub conversation_id: String,
    /// Artifact id; generated when absent.
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// Artifact content.
    pub content: String,
    /// Display category.
    pub category: Option<String>,
}

/// Partial artifact update.
#[derive(Debug, Clone, Default)]
pub struct ArtifactUpdate {
    /// Replace the display name.
    pub name: Option<String>,
    /// Replace the content.
    pub content: Option<String>,
    /// Replace the category.
    pub category: Option<String>,
}

impl ArtifactUpdate {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_none() && self.category.is_none()
    }
}

/// Persistent store for conversation messages and artifacts.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    pool: SqlitePool,
}

impl ConversationStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statements fail.
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                conversation_id TEXT NOT NULL,
                id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                is_incomplete INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (conversation_id, id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS artifacts (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                share_slug TEXT UNIQUE,
                is_public INTEGER NOT NULL DEFAULT 0,
                views INTEGER NOT NULL DEFAULT 0,
                category TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Saves a message. Insert-or-update on `(conversation_id, id)` in one
    /// statement; safe under concurrent invocation with the same key.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    #[instrument(skip(self, upsert), fields(conversation_id = %upsert.conversation_id, message_id = %upsert.id))]
    pub async fn upsert_message(&self, upsert: &MessageUpsert) -> Result<Message, StoreError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO messages (conversation_id, id, role, content, is_incomplete, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(conversation_id, id) DO UPDATE SET
                 role = excluded.role,
                 content = excluded.content,
                 is_incomplete = excluded.is_incomplete,
                 updated_at = excluded.updated_at",
        )
        .bind(&upsert.conversation_id)
        .bind(&upsert.id)
        .bind(upsert.role.as_str())
        .bind(&upsert.content)
        .bind(upsert.is_incomplete)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_message(&upsert.conversation_id, &upsert.id).await
    }

    /// Fetches a message by its logical key.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row exists.
    pub async fn get_message(
        &self,
        conversation_id: &str,
        id: &str,
    ) -> Result<Message, StoreError> {
        let row = sqlx::query("SELECT * FROM messages WHERE conversation_id = ? AND id = ?")
            .bind(conversation_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{conversation_id}/{id}")))?;
        message_from_row(&row)
    }

    /// Number of stored rows for a conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_messages(&self, conversation_id: &str) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Saves an artifact. Insert-or-update keyed on the artifact id; share
    /// state and view count are never touched by the upsert path.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    #[instrument(skip(self, upsert), fields(conversation_id = %upsert.conversation_id))]
    pub async fn upsert_artifact(&self, upsert: &ArtifactUpsert) -> Result<Artifact, StoreError> {
        let id = upsert
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO artifacts (id, conversation_id, name, content, category, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 content = excluded.content,
                 category = excluded.category,
                 updated_at = excluded.updated_at",
        )
        .bind(&id)
        .bind(&upsert.conversation_id)
        .bind(&upsert.name)
        .bind(&upsert.content)
        .bind(&upsert.category)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_artifact(&id).await
    }

    /// Applies a partial artifact update as one atomic statement.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the artifact does not exist.
    #[instrument(skip(self, update))]
    pub async fn update_artifact(
        &self,
        id: &str,
        update: &ArtifactUpdate,
    ) -> Result<Artifact, StoreError> {
        let mut sets: Vec<&str> = vec!["updated_at = ?"];
        let mut binds: Vec<String> = vec![Utc::now().to_rfc3339()];
        if let Some(name) = &update.name {
            sets.push("name = ?");
            binds.push(name.clone());
        }
        if let Some(content) = &update.content {
            sets.push("content = ?");
            binds.push(content.clone());
        }
        if let Some(category) = &update.category {
            sets.push("category = ?");
            binds.push(category.clone());
        }

        let sql = format!("UPDATE artifacts SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        let result = query.bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.get_artifact(id).await
    }

    /// Marks an artifact public, assigning a share slug on first share.
    /// `COALESCE` keeps an already-assigned slug stable across repeat calls.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the artifact does not exist.
    #[instrument(skip(self))]
    pub async fn share_artifact(&self, id: &str) -> Result<Artifact, StoreError> {
        let candidate = new_share_slug();
        let result = sqlx::query(
            "UPDATE artifacts
             SET share_slug = COALESCE(share_slug, ?), is_public = 1, updated_at = ?
             WHERE id = ?",
        )
        .bind(&candidate)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.get_artifact(id).await
    }

    /// Withdraws an artifact from public reads. The slug is kept so a
    /// re-share resolves to the same URL.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the artifact does not exist.
    #[instrument(skip(self))]
    pub async fn unshare_artifact(&self, id: &str) -> Result<Artifact, StoreError> {
        let result = sqlx::query("UPDATE artifacts SET is_public = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.get_artifact(id).await
    }

    /// Public read by slug: bumps the view counter and returns the artifact.
    /// The increment is a single statement, so concurrent readers never lose
    /// counts.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no public artifact has the slug.
    #[instrument(skip(self))]
    pub async fn record_view(&self, slug: &str) -> Result<Artifact, StoreError> {
        let result = sqlx::query(
            "UPDATE artifacts SET views = views + 1 WHERE share_slug = ? AND is_public = 1",
        )
        .bind(slug)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(slug.to_string()));
        }

        let row = sqlx::query("SELECT * FROM artifacts WHERE share_slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        artifact_from_row(&row)
    }

    /// Fetches an artifact by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no row exists.
    pub async fn get_artifact(&self, id: &str) -> Result<Artifact, StoreError> {
        let row = sqlx::query("SELECT * FROM artifacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        artifact_from_row(&row)
    }
}

fn new_share_slug() -> String {
    let mut slug = uuid::Uuid::new_v4().simple().to_string();
    slug.truncate(12);
    slug
}

fn message_from_row(row: &SqliteRow) -> Result<Message, StoreError> {
    let role_raw: String = row.try_get("role")?;
    Ok(Message {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        role: MessageRole::parse(&role_raw),
        content: row.try_get("content")?,
        is_incomplete: row.try_get("is_incomplete")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn artifact_from_row(row: &SqliteRow) -> Result<Artifact, StoreError> {
    Ok(Artifact {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        name: row.try_get("name")?,
        content: row.try_get("content")?,
        share_slug: row.try_get("share_slug")?,
        is_public: row.try_get("is_public")?,
        views: row.try_get("views")?,
        category: row.try_get("category")?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| StoreError::Internal(anyhow::anyhow!("bad stored timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> ConversationStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = ConversationStore::new(pool);
        store.init().await.unwrap();
        store
    }

    fn message(content: &str) -> MessageUpsert {
        MessageUpsert {
            conversation_id: "c1".to_string(),
            id: "m1".to_string(),
            role: MessageRole::Assistant,
            content: content.to_string(),
            is_incomplete: false,
        }
    }

    #[tokio::test]
    async fn double_upsert_converges_to_one_row() {
        let store = store().await;
        store.upsert_message(&message("draft")).await.unwrap();
        let saved = store.upsert_message(&message("final")).await.unwrap();

        assert_eq!(saved.content, "final");
        assert_eq!(store.count_messages("c1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_upserts_with_same_key_yield_one_row() {
        let store = store().await;
        let first = message("writer a");
        let second = message("writer b");
        let (a, b) = tokio::join!(
            store.upsert_message(&first),
            store.upsert_message(&second),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(store.count_messages("c1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn distinct_message_ids_stay_distinct() {
        let store = store().await;
        store.upsert_message(&message("one")).await.unwrap();
        let mut second = message("two");
        second.id = "m2".to_string();
        store.upsert_message(&second).await.unwrap();

        assert_eq!(store.count_messages("c1").await.unwrap(), 2);
    }

    fn artifact() -> ArtifactUpsert {
        ArtifactUpsert {
            conversation_id: "c1".to_string(),
            id: Some("a1".to_string()),
            name: "Report".to_string(),
            content: "<html></html>".to_string(),
            category: None,
        }
    }

    #[tokio::test]
    async fn artifact_upsert_preserves_share_state() {
        let store = store().await;
        store.upsert_artifact(&artifact()).await.unwrap();
        let shared = store.share_artifact("a1").await.unwrap();
        assert!(shared.is_public);
        let slug = shared.share_slug.clone().unwrap();

        // Re-saving content must not clear the slug or publicness.
        let mut updated = artifact();
        updated.content = "<html>v2</html>".to_string();
        let saved = store.upsert_artifact(&updated).await.unwrap();
        assert_eq!(saved.share_slug.as_deref(), Some(slug.as_str()));
        assert!(saved.is_public);
        assert_eq!(saved.content, "<html>v2</html>");
    }

    #[tokio::test]
    async fn share_slug_is_stable_across_repeat_shares() {
        let store = store().await;
        store.upsert_artifact(&artifact()).await.unwrap();

        let first = store.share_artifact("a1").await.unwrap();
        store.unshare_artifact("a1").await.unwrap();
        let second = store.share_artifact("a1").await.unwrap();

        assert_eq!(first.share_slug, second.share_slug);
    }

    #[tokio::test]
    async fn views_increment_on_public_read_only() {
        let store = store().await;
        store.upsert_artifact(&artifact()).await.unwrap();
        let shared = store.share_artifact("a1").await.unwrap();
        let slug = shared.share_slug.unwrap();

        let read = store.record_view(&slug).await.unwrap();
        assert_eq!(read.views, 1);
        let read = store.record_view(&slug).await.unwrap();
        assert_eq!(read.views, 2);

        store.unshare_artifact("a1").await.unwrap();
        let err = store.record_view(&slug).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_artifact_rejects_unknown_id() {
        let store = store().await;
        let err = store
            .update_artifact(
                "missing",
                &ArtifactUpdate {
                    name: Some("x".to_string()),
                    ..ArtifactUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
