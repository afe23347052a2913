//! Shared helpers for driving the API router in-process.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

use camus_server::backend::{UnconfiguredBackend, WorkerBackend};
use camus_server::infrastructure::server::api_router;
use camus_server::state::AppState;

/// Builds application state over a single-connection in-memory database.
///
/// In-memory SQLite gives every pooled connection its own database, so the
/// pool must stay at one connection for tests to see their own writes.
pub async fn test_state(backend: Arc<dyn WorkerBackend>) -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    AppState::with_pool(pool, backend)
        .await
        .expect("state bootstrap")
}

/// Router plus a handle on its state, with no worker backend configured.
pub async fn test_app() -> (Router, AppState) {
    let state = test_state(Arc::new(UnconfiguredBackend)).await;
    (api_router(state.clone()), state)
}

/// Sends one request through the router and decodes the JSON body.
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(req).await.expect("router response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON response body")
    };
    (status, json)
}
