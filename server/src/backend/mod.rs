//! Client for the external AI backend (`BACKEND_ENDPOINT`).
//!
//! The backend plans and generates reports asynchronously; this module holds
//! the [`WorkerBackend`] seam, its reqwest implementation, and the fixed
//! field mapping the planner expects.

pub mod client;
pub mod plan;

pub use client::{BackendError, HttpWorkerBackend, UnconfiguredBackend, WorkerBackend};
pub use plan::{PlanRequest, PlanUpstreamRequest};
