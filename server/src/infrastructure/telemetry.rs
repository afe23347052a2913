//! Telemetry setup: structured JSON logging with env-filter control.

use anyhow::{Context, Result};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Builder for setting up logging.
pub struct TelemetryBuilder {
    service_name: String,
    log_level: String,
}

impl TelemetryBuilder {
    /// Creates a builder for the named service.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_level: "info".to_string(),
        }
    }

    /// Sets the default log level used when `RUST_LOG` is unset.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Initializes the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if a subscriber is already installed.
    pub fn init(self) -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let fmt_layer = fmt::layer().json().boxed();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .with_context(|| format!("failed to init subscriber for {}", self.service_name))
    }
}
