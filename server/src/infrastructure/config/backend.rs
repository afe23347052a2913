//! External worker backend settings.

use serde::Deserialize;

/// Settings for the external AI backend.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BackendSettings {
    /// Base URL of the worker (`BACKEND_ENDPOINT`). When unset, plan and
    /// dispatch calls fail with a configuration error.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

pub(super) fn default_timeout_secs() -> u64 {
    30
}
