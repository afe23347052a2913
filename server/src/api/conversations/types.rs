//! Request/response types for the conversation API.

use serde::{Deserialize, Serialize};

use crate::conversation::{Artifact, ArtifactUpdate, Message, MessageRole};

/// Idempotent message save request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMessageRequest {
    /// Client-generated message id; the idempotence key together with the
    /// conversation id.
    pub id: String,
    /// Author role.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
    /// Assistant message still streaming.
    #[serde(default)]
    pub is_incomplete: bool,
}

/// Envelope for a saved message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageEnvelope {
    /// The stored row after the upsert.
    pub message: Message,
}

/// Idempotent artifact save request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveArtifactRequest {
    /// Artifact id; server-generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// Artifact content (HTML block).
    pub content: String,
    /// Display category.
    #[serde(default)]
    pub category: Option<String>,
}

/// Partial artifact update, including share state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArtifactRequest {
    /// Artifact to update.
    pub id: String,
    /// Replace the display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Replace the content.
    #[serde(default)]
    pub content: Option<String>,
    /// Replace the category.
    #[serde(default)]
    pub category: Option<String>,
    /// Share (`true`) or withdraw (`false`) the artifact.
    #[serde(default)]
    pub is_public: Option<bool>,
}

impl UpdateArtifactRequest {
    /// The field-level part of the update.
    #[must_use]
    pub fn field_update(&self) -> ArtifactUpdate {
        ArtifactUpdate {
            name: self.name.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
        }
    }
}

/// Envelope for an artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactEnvelope {
    /// The stored artifact.
    pub artifact: Artifact,
}
