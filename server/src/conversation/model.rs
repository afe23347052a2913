//! Conversation entities: messages and artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a conversation message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Human participant.
    User,
    /// AI participant.
    Assistant,
    /// Anything else (system notes, tool output).
    #[serde(other)]
    Other,
}

impl MessageRole {
    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Other => "other",
        }
    }

    /// Parse a stored role; unknown values fold into `Other`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "user" => MessageRole::User,
            "assistant" => MessageRole::Assistant,
            _ => MessageRole::Other,
        }
    }
}

/// A conversation message. The `(conversation_id, id)` pair is the logical
/// identity: concurrent saves of the same pair converge to one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Client-generated message id, unique within the conversation.
    pub id: String,
    /// Conversation the message belongs to.
    pub conversation_id: String,
    /// Author role.
    pub role: MessageRole,
    /// Message content (may embed an HTML artifact block).
    pub content: String,
    /// Assistant message still streaming.
    pub is_incomplete: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A generated content item derived from a conversation, optionally shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Unique identifier.
    pub id: String,
    /// Conversation the artifact came from.
    pub conversation_id: String,
    /// Display name.
    pub name: String,
    /// Artifact content (HTML block).
    pub content: String,
    /// Public share slug; assigned on first share, stable afterwards.
    pub share_slug: Option<String>,
    /// Whether the artifact is publicly readable.
    pub is_public: bool,
    /// Monotonically incrementing public view counter.
    pub views: i64,
    /// Display category.
    pub category: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}
