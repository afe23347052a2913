//! Route-level error envelope.
//!
//! Every handler error is converted here into a JSON body of the shape
//! `{"error": .., "details"?: ..}`; nothing propagates as an unhandled
//! panic to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::backend::BackendError;
use crate::task::{StoreError, TaskError};

/// API errors for task and conversation operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Lifecycle-level error.
    #[error(transparent)]
    Task(#[from] TaskError),
    /// Storage-level error.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// External backend error.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// Missing or malformed request field.
    #[error("validation error: {0}")]
    Validation(String),
    /// Session required but absent.
    #[error("authentication required")]
    Unauthenticated,
}

impl ApiError {
    fn status_and_details(&self) -> (StatusCode, Option<Value>) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, None),
            ApiError::Store(err) | ApiError::Task(TaskError::Store(err)) => match err {
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, None),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, None),
            },
            ApiError::Task(TaskError::Transition(_)) => (StatusCode::CONFLICT, None),
            ApiError::Task(TaskError::Unauthorized) => (StatusCode::UNAUTHORIZED, None),
            ApiError::Task(TaskError::BadCallback(_)) => (StatusCode::BAD_REQUEST, None),
            ApiError::Backend(err) | ApiError::Task(TaskError::Dispatch(err)) => match err {
                BackendError::Unconfigured | BackendError::Config(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, None)
                }
                BackendError::Network(_) => (StatusCode::BAD_GATEWAY, None),
                BackendError::Upstream { status, body } => (
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                    Some(body.clone()),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, details) = self.status_and_details();
        let mut body = json!({ "error": self.to_string() });
        if let Some(details) = details {
            body["details"] = details;
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{InvalidTransition, TaskStatus};

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::Store(StoreError::NotFound("t1".to_string()));
        let (status, _) = err.status_and_details();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_transition_maps_to_409() {
        let err = ApiError::Task(TaskError::Transition(InvalidTransition {
            from: TaskStatus::Completed,
            to: TaskStatus::Failed,
        }));
        let (status, _) = err.status_and_details();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn upstream_status_is_proxied() {
        let err = ApiError::Backend(BackendError::Upstream {
            status: 422,
            body: json!({"error": "bad topic"}),
        });
        let (status, details) = err.status_and_details();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(details, Some(json!({"error": "bad topic"})));
    }

    #[test]
    fn unconfigured_backend_maps_to_500() {
        let err = ApiError::Backend(BackendError::Unconfigured);
        let (status, _) = err.status_and_details();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
