//! HTTP client for the external report worker.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::plan::PlanUpstreamRequest;
use crate::task::Task;

/// Errors from the external worker backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No backend endpoint configured.
    #[error("BACKEND_ENDPOINT not configured")]
    Unconfigured,
    /// Invalid endpoint or URL construction failure.
    #[error("backend configuration error: {0}")]
    Config(String),
    /// Transport-level failure (connect, timeout).
    #[error("backend unreachable: {0}")]
    Network(String),
    /// Backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Upstream {
        /// Upstream HTTP status code, proxied to the caller.
        status: u16,
        /// Upstream response body.
        body: Value,
    },
}

/// Seam to the external worker that plans and generates reports.
#[async_trait]
pub trait WorkerBackend: Send + Sync {
    /// Asks the planner for a staged plan. The response is returned verbatim.
    async fn plan(&self, request: PlanUpstreamRequest) -> Result<Value, BackendError>;

    /// Starts asynchronous report generation for a task. The worker reports
    /// back through the task callback endpoint.
    async fn dispatch(&self, task: &Task) -> Result<(), BackendError>;
}

/// reqwest-based [`WorkerBackend`] talking to `BACKEND_ENDPOINT`.
pub struct HttpWorkerBackend {
    client: Client,
    base_url: Url,
    callback_base: Url,
}

impl HttpWorkerBackend {
    /// Creates a backend client.
    ///
    /// `endpoint` is the worker base URL; `callback_base` is this server's
    /// public base URL, used to build per-task callback URLs.
    ///
    /// # Errors
    ///
    /// Returns `Config` if either URL fails to parse.
    pub fn new(
        endpoint: &str,
        callback_base: &str,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: parse_base(endpoint)?,
            callback_base: parse_base(callback_base)?,
        })
    }

    fn join(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Config(format!("invalid URL join '{path}': {e}")))
    }

    fn callback_url(&self, task_id: &str) -> Result<Url, BackendError> {
        self.callback_base
            .join(&format!("api/task/{task_id}/callback"))
            .map_err(|e| BackendError::Config(format!("invalid callback URL: {e}")))
    }
}

// Base URLs must end with '/' so Url::join keeps the path prefix.
fn parse_base(raw: &str) -> Result<Url, BackendError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| BackendError::Config(format!("invalid URL '{raw}': {e}")))
}

async fn read_upstream_error(res: reqwest::Response) -> BackendError {
    let status = res.status().as_u16();
    let body = match res.text().await {
        Ok(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Err(_) => Value::Null,
    };
    warn!(status, "backend returned non-success status");
    BackendError::Upstream { status, body }
}

#[async_trait]
impl WorkerBackend for HttpWorkerBackend {
    async fn plan(&self, request: PlanUpstreamRequest) -> Result<Value, BackendError> {
        let url = self.join("report/plan")?;
        debug!(%url, "forwarding plan request");

        let res = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if res.status() == StatusCode::OK {
            res.json::<Value>()
                .await
                .map_err(|e| BackendError::Network(format!("invalid planner response: {e}")))
        } else {
            Err(read_upstream_error(res).await)
        }
    }

    async fn dispatch(&self, task: &Task) -> Result<(), BackendError> {
        let url = self.join("report/generate")?;
        let callback_url = self.callback_url(&task.id)?;
        debug!(task_id = %task.id, %url, "dispatching generation to worker");

        let body = json!({
            "task_id": task.id,
            "params": task.params,
            "stages": task.stages,
            "callback_url": callback_url.as_str(),
        });

        let res = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        if res.status().is_success() {
            Ok(())
        } else {
            Err(read_upstream_error(res).await)
        }
    }
}

/// Backend used when `BACKEND_ENDPOINT` is unset: every call fails with
/// `Unconfigured`, which the API surfaces as a 500.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredBackend;

#[async_trait]
impl WorkerBackend for UnconfiguredBackend {
    async fn plan(&self, _request: PlanUpstreamRequest) -> Result<Value, BackendError> {
        Err(BackendError::Unconfigured)
    }

    async fn dispatch(&self, _task: &Task) -> Result<(), BackendError> {
        Err(BackendError::Unconfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::plan::PlanRequest;
    use crate::task::{NewTask, TaskStore};
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server_uri: &str) -> HttpWorkerBackend {
        HttpWorkerBackend::new(server_uri, "http://localhost:8080", Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn plan_posts_mapped_body_and_returns_response_verbatim() {
        let server = MockServer::start().await;
        let expected_body = json!({
            "topic_and_objective": "T",
            "target_population": "P",
            "questionnaire": "Q",
            "report_dimensions": "R",
            "background_info": "B",
        });
        Mock::given(method("POST"))
            .and(path("/report/plan"))
            .and(body_json(&expected_body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stages": [1, 2]})))
            .expect(1)
            .mount(&server)
            .await;

        let req = PlanRequest {
            topic: "T".to_string(),
            persona: Some("P".to_string()),
            questions: Some("Q".to_string()),
            report_dimensions: Some("R".to_string()),
            basic_knowledge: Some("B".to_string()),
        };
        let response = backend(&server.uri()).plan(req.into()).await.unwrap();
        assert_eq!(response, json!({"stages": [1, 2]}));
    }

    #[tokio::test]
    async fn plan_proxies_upstream_status_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/report/plan"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"error": "bad topic"})))
            .mount(&server)
            .await;

        let req = PlanRequest {
            topic: "T".to_string(),
            persona: None,
            questions: None,
            report_dimensions: None,
            basic_knowledge: None,
        };
        let err = backend(&server.uri()).plan(req.into()).await.unwrap_err();
        match err {
            BackendError::Upstream { status, body } => {
                assert_eq!(status, 422);
                assert_eq!(body, json!({"error": "bad topic"}));
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_includes_task_id_and_callback_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/report/generate"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = TaskStore::new(pool);
        store.init().await.unwrap();
        let task = store
            .create(NewTask {
                title: String::new(),
                user_id: None,
                session_id: Some("s1".to_string()),
                params: json!({"topic": "T"}),
            })
            .await
            .unwrap();

        backend(&server.uri()).dispatch(&task).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["task_id"], json!(task.id));
        assert_eq!(
            body["callback_url"],
            json!(format!("http://localhost:8080/api/task/{}/callback", task.id))
        );
    }

    #[tokio::test]
    async fn unconfigured_backend_always_fails() {
        let err = UnconfiguredBackend
            .plan(PlanUpstreamRequest {
                topic_and_objective: "T".to_string(),
                target_population: None,
                questionnaire: None,
                report_dimensions: None,
                background_info: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Unconfigured));
    }
}
