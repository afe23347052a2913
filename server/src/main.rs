//! Camus server binary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use secrecy::ExposeSecret;

use camus_server::backend::{HttpWorkerBackend, UnconfiguredBackend, WorkerBackend};
use camus_server::infrastructure::config::Settings;
use camus_server::infrastructure::server::run_server;
use camus_server::infrastructure::telemetry::TelemetryBuilder;
use camus_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new().context("failed to load configuration")?;

    TelemetryBuilder::new(config.telemetry.service_name.clone())
        .with_log_level(config.telemetry.log_level.clone())
        .init()?;

    let backend: Arc<dyn WorkerBackend> = match config.backend.endpoint.as_deref() {
        Some(endpoint) => Arc::new(HttpWorkerBackend::new(
            endpoint,
            &config.server.callback_base(),
            Duration::from_secs(config.backend.timeout_secs),
        )?),
        None => {
            tracing::warn!("no backend endpoint configured, plan and dispatch are disabled");
            Arc::new(UnconfiguredBackend)
        }
    };

    let state = AppState::new(config.database.url.expose_secret(), backend)
        .await
        .context("failed to initialize application state")?;

    tokio::select! {
        result = run_server(&config, state) => {
            result.context("server error")?;
        }
        () = shutdown_signal() => {
            tracing::info!("shutdown signal received, stopping server");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
