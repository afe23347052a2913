//! Camus server - task lifecycle service for the Camus report generator.
//!
//! This crate provides the server side of the Camus synthetic-survey
//! product: the task status machine and synchronization protocol, the
//! conversation/artifact persistence with idempotent upserts, the proxy to
//! the external AI backend, and the client-side watch (polling + routing)
//! components.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// REST API (tasks, conversations, plan proxy).
pub mod api;
/// Client for the external AI backend.
pub mod backend;
/// Conversation persistence (messages, artifacts).
pub mod conversation;
/// Infrastructure components (config, server, telemetry).
pub mod infrastructure;
/// Explicit per-session client state.
pub mod session;
/// Shared application state.
pub mod state;
/// Task domain: model, status machine, store, lifecycle.
pub mod task;
/// Client-side task watching: polling and routing.
pub mod watch;
