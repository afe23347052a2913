//! REST API endpoints for conversation messages and artifacts.

pub mod handlers;
pub mod routes;
pub mod types;

pub use routes::routes;
pub use types::{
    ArtifactEnvelope, MessageEnvelope, SaveArtifactRequest, SaveMessageRequest,
    UpdateArtifactRequest,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::MessageRole;
    use serde_json::json;

    #[test]
    fn save_message_request_deserialization() {
        let req: SaveMessageRequest = serde_json::from_value(json!({
            "id": "m1",
            "role": "assistant",
            "content": "hello",
            "isIncomplete": true,
        }))
        .unwrap();
        assert_eq!(req.role, MessageRole::Assistant);
        assert!(req.is_incomplete);
    }

    #[test]
    fn is_incomplete_defaults_to_false() {
        let req: SaveMessageRequest =
            serde_json::from_value(json!({"id": "m1", "role": "user", "content": "hi"})).unwrap();
        assert!(!req.is_incomplete);
    }

    #[test]
    fn update_request_detects_empty_bodies() {
        let req: UpdateArtifactRequest = serde_json::from_value(json!({"id": "a1"})).unwrap();
        assert!(req.field_update().is_empty());
        assert!(req.is_public.is_none());

        let req: UpdateArtifactRequest =
            serde_json::from_value(json!({"id": "a1", "isPublic": true})).unwrap();
        assert_eq!(req.is_public, Some(true));
    }
}
