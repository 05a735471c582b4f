//! REST client for the remote inventory store.

mod client;
mod error;
mod types;

pub use client::RemoteStoreClient;
pub use error::{RemoteStoreError, Result};
pub use types::*;
