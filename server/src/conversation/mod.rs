//! Conversation persistence: messages and artifacts with idempotent,
//! storage-level upserts.

pub mod model;
pub mod store;

pub use model::{Artifact, Message, MessageRole};
pub use store::{ArtifactUpdate, ArtifactUpsert, ConversationStore, MessageUpsert};
