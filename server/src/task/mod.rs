//! Task domain: model, status machine, store and lifecycle service.

pub mod lifecycle;
pub mod model;
pub mod status;
pub mod store;

pub use lifecycle::{CallbackOutcome, CallbackPayload, CallbackSignal, TaskError, TaskLifecycle};
pub use model::{NewTask, Task, TaskOwner, TaskPatch};
pub use status::{InvalidTransition, TaskStatus};
pub use store::{StoreError, TaskStore};
