//! Sync domain models and services.

mod coordinator;
mod model;
mod scheduler;

pub use coordinator::*;
pub use model::*;
pub use scheduler::*;
