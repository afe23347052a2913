//! REST API for the Camus task service.
//!
//! This module provides the HTTP endpoints for the task lifecycle,
//! conversation persistence and the plan proxy.

pub mod conversations;
pub mod error;
pub mod tasks;

pub use error::ApiError;
