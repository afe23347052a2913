/// Configuration management for the server.
pub mod config;
/// HTTP server assembly.
pub mod server;
/// Telemetry setup for logging.
pub mod telemetry;
