//! Key/value snapshot cache over a single SQLite table.
//!
//! One row per cache key, overwritten wholesale on every write. The cache is
//! best-effort: write failures are logged and swallowed, and a missing or
//! corrupt row reads as absent.

use std::path::Path;
use std::sync::Mutex;

use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};

use stockroom_core::sync::{CacheSnapshot, SnapshotCache};

use crate::errors::StorageError;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS cache_snapshots (
    cache_key TEXT PRIMARY KEY NOT NULL,
    payload TEXT NOT NULL,
    cached_at TEXT NOT NULL
)";

const UPSERT_SQL: &str = "INSERT INTO cache_snapshots (cache_key, payload, cached_at)
    VALUES (?1, ?2, ?3)
    ON CONFLICT(cache_key) DO UPDATE SET payload = excluded.payload, cached_at = excluded.cached_at";

/// On-device snapshot cache scoped by key (one key per identity).
pub struct SqliteSnapshotCache {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory cache for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute(CREATE_TABLE_SQL, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn write_snapshot(&self, key: &str, snapshot: &CacheSnapshot) -> Result<(), StorageError> {
        let payload = serde_json::to_string(snapshot)?;
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute(
            UPSERT_SQL,
            params![key, payload, snapshot.cached_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn read_snapshot(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        let payload = conn
            .query_row(
                "SELECT payload FROM cache_snapshots WHERE cache_key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    /// Drop one cached entry. Not used by the sync flow (sign-out retains the
    /// entry); exposed for host-side account deletion.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute(
            "DELETE FROM cache_snapshots WHERE cache_key = ?1",
            params![key],
        )?;
        Ok(())
    }
}

impl SnapshotCache for SqliteSnapshotCache {
    fn write(&self, key: &str, snapshot: &CacheSnapshot) {
        if let Err(err) = self.write_snapshot(key, snapshot) {
            warn!("[InventoryCache] Write failed for '{}': {}", key, err);
        }
    }

    fn read(&self, key: &str) -> Option<CacheSnapshot> {
        let payload = match self.read_snapshot(key) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                warn!("[InventoryCache] Read failed for '{}': {}", key, err);
                return None;
            }
        };
        match serde_json::from_str(&payload) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                // Corrupt entries read as absent; the next write replaces them.
                debug!("[InventoryCache] Discarding corrupt entry '{}': {}", key, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockroom_core::inventory::{InventoryItem, SizeVariant};

    fn snapshot(title: &str) -> CacheSnapshot {
        CacheSnapshot {
            inventory: vec![InventoryItem {
                id: "i1".to_string(),
                sku: "A1".to_string(),
                title: title.to_string(),
                image_url: None,
                variants: vec![SizeVariant::new("M", 2, "R1")],
                custom_fields: Default::default(),
            }],
            custom_fields: Vec::new(),
            cached_at: Utc::now(),
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let cache = SqliteSnapshotCache::open_in_memory().unwrap();
        let written = snapshot("Shirt");
        cache.write("inventory:user-1", &written);
        let read = cache.read("inventory:user-1").unwrap();
        assert_eq!(read, written);
    }

    #[test]
    fn writes_overwrite_wholesale() {
        let cache = SqliteSnapshotCache::open_in_memory().unwrap();
        cache.write("inventory:user-1", &snapshot("First"));
        cache.write("inventory:user-1", &snapshot("Second"));
        let read = cache.read("inventory:user-1").unwrap();
        assert_eq!(read.inventory[0].title, "Second");

        let conn = cache.conn.lock().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM cache_snapshots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn missing_key_reads_as_absent() {
        let cache = SqliteSnapshotCache::open_in_memory().unwrap();
        assert!(cache.read("inventory:guest").is_none());
    }

    #[test]
    fn corrupt_payload_reads_as_absent() {
        let cache = SqliteSnapshotCache::open_in_memory().unwrap();
        {
            let conn = cache.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO cache_snapshots (cache_key, payload, cached_at) VALUES (?1, ?2, ?3)",
                params!["inventory:user-1", "{not json", "2026-01-01T00:00:00Z"],
            )
            .unwrap();
        }
        assert!(cache.read("inventory:user-1").is_none());
    }

    #[test]
    fn keys_are_isolated_per_identity() {
        let cache = SqliteSnapshotCache::open_in_memory().unwrap();
        cache.write("inventory:user-1", &snapshot("Mine"));
        cache.write("inventory:user-2", &snapshot("Theirs"));
        assert_eq!(
            cache.read("inventory:user-1").unwrap().inventory[0].title,
            "Mine"
        );
        assert_eq!(
            cache.read("inventory:user-2").unwrap().inventory[0].title,
            "Theirs"
        );
    }

    #[test]
    fn remove_deletes_a_single_entry() {
        let cache = SqliteSnapshotCache::open_in_memory().unwrap();
        cache.write("inventory:user-1", &snapshot("Mine"));
        cache.write("inventory:user-2", &snapshot("Theirs"));
        cache.remove("inventory:user-1").unwrap();
        assert!(cache.read("inventory:user-1").is_none());
        assert!(cache.read("inventory:user-2").is_some());
    }
}
