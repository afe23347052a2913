//! Configuration management for the Camus server.
//!
//! Structured configuration for the HTTP server, database, external
//! backend and telemetry, built from defaults plus `CAMUS__`-prefixed
//! environment variables.

pub mod backend;
pub mod database;
pub mod server;
pub mod telemetry;

pub use backend::BackendSettings;
pub use database::DatabaseSettings;
pub use server::ServerSettings;
pub use telemetry::TelemetrySettings;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Top-level configuration for the Camus server.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Server settings.
    pub server: ServerSettings,
    /// Database settings.
    pub database: DatabaseSettings,
    /// External backend settings.
    #[serde(default)]
    pub backend: BackendSettings,
    /// Telemetry settings.
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Creates a settings instance from defaults and environment variables.
    ///
    /// The bare `BACKEND_ENDPOINT` variable is honored as an alias for
    /// `CAMUS__BACKEND__ENDPOINT`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or
    /// deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite:camus.db?mode=rwc")?
            .set_default("telemetry.service_name", "camus-server")?
            .add_source(Environment::with_prefix("CAMUS").separator("__"))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;
        if settings.backend.endpoint.is_none() {
            if let Ok(endpoint) = std::env::var("BACKEND_ENDPOINT") {
                settings.backend.endpoint = Some(endpoint);
            }
        }
        Ok(settings)
    }
}
