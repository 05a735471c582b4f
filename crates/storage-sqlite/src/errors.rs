//! Error types for the storage crate.

use thiserror::Error;

/// Errors raised while opening or using the cache database.
///
/// These never reach the sync engine: the [`SnapshotCache`] implementation
/// swallows them, because the cache is an optimization and never a source of
/// truth.
///
/// [`SnapshotCache`]: stockroom_core::sync::SnapshotCache
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache connection lock is poisoned")]
    Poisoned,
}
