//! HTTP server assembly.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api;
use crate::infrastructure::config::Settings;
use crate::state::AppState;

async fn health_check() -> &'static str {
    "OK"
}

/// Builds the API router over the given state. Tests drive this router
/// directly without binding a socket.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(api::tasks::routes())
        .merge(api::conversations::routes())
        .with_state(Arc::new(state))
}

/// Runs the HTTP server with the Prometheus exporter mounted.
///
/// # Errors
///
/// Returns an error if the metrics recorder, bind or serve step fails.
pub async fn run_server(config: &Settings, state: AppState) -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))?;

    let app = api_router(state).route("/metrics", get(move || std::future::ready(handle.render())));

    let addr_str = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = addr_str.parse()?;

    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
