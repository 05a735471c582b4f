//! SQLite-backed on-device snapshot cache.

mod cache;
mod errors;

pub use cache::SqliteSnapshotCache;
pub use errors::StorageError;
