//! Inventory domain models and pure mutation operations.

mod model;
mod mutations;

pub use model::*;
pub use mutations::*;
