//! Client-side task watching: polling loop and route reactor.
//!
//! Used by the web client process to follow a task until it terminates and
//! to navigate between the form, stage, progress and report views.

pub mod poller;
pub mod router;

pub use poller::{
    HttpStatusSource, TaskPoller, TaskStatusSource, WatchError, DEFAULT_POLL_INTERVAL,
};
pub use router::{route_for_status, FailedRouting, RouteReactor};
