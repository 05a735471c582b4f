//! Sync domain models and the storage contracts at the engine's seams.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PersistenceError;
use crate::inventory::{CustomFieldDefinition, InventoryBook, InventoryItem};

/// Cache identity used while no user is signed in.
pub const GUEST_CACHE_IDENTITY: &str = "guest";

/// Cache key for an identity's snapshot.
pub fn cache_key(identity: Option<&str>) -> String {
    format!("inventory:{}", identity.unwrap_or(GUEST_CACHE_IDENTITY))
}

/// On-device snapshot of the full inventory, overwritten wholesale on every
/// write and never merged field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub inventory: Vec<InventoryItem>,
    pub custom_fields: Vec<CustomFieldDefinition>,
    pub cached_at: DateTime<Utc>,
}

impl CacheSnapshot {
    pub fn of_book(book: &InventoryBook, cached_at: DateTime<Utc>) -> Self {
        Self {
            inventory: book.items.clone(),
            custom_fields: book.custom_fields.clone(),
            cached_at,
        }
    }
}

/// The remote store's durable row, keyed by user identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    pub identity: String,
    pub inventory: Vec<InventoryItem>,
    pub custom_fields: Vec<CustomFieldDefinition>,
    pub updated_at: DateTime<Utc>,
}

/// How a mutation schedules persistence.
///
/// Continuous-typing edits (quantity, location, SKU, title, field values)
/// debounce on the short delay; everything else watched for change uses the
/// general delay. Structurally significant edits bypass the debounce via
/// [`FlushReason::KeyMutation`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Typing,
    Change,
}

/// Why an immediate flush was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReason {
    /// Structurally significant edit: item add/edit/delete, variant
    /// add/delete, import, custom-field definition changes.
    KeyMutation,
    /// Host application entering background / losing foreground.
    AppBackground,
    /// Host application about to terminate. Best effort only.
    AppTerminate,
    Manual,
}

impl FlushReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyMutation => "key_mutation",
            Self::AppBackground => "app_background",
            Self::AppTerminate => "app_terminate",
            Self::Manual => "manual",
        }
    }
}

/// Engine status surfaced to the host for user-visible reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub loaded: bool,
    pub dirty: bool,
    pub saving: bool,
}

/// The full snapshot handed to the remote store by one save call.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistRequest {
    pub identity: String,
    pub inventory: Vec<InventoryItem>,
    pub custom_fields: Vec<CustomFieldDefinition>,
}

/// Remote durable store contract, keyed by user identity.
#[async_trait::async_trait]
pub trait RemoteInventoryStore: Send + Sync {
    /// Insert an empty row for the identity if none exists. Must never
    /// overwrite an existing row.
    async fn ensure_row(&self, identity: &str) -> Result<(), PersistenceError>;

    /// Point lookup; absent is not an error.
    async fn read_row(&self, identity: &str) -> Result<Option<InventoryRow>, PersistenceError>;

    /// Full-snapshot overwrite upsert. No partial updates.
    async fn save_row(
        &self,
        identity: &str,
        inventory: &[InventoryItem],
        custom_fields: &[CustomFieldDefinition],
    ) -> Result<(), PersistenceError>;
}

/// On-device snapshot cache contract.
///
/// The cache is an optimization, never a source of truth: `write` is
/// best-effort and implementations must swallow storage failures rather than
/// interrupt the caller, and `read` reports a missing or corrupt value as
/// absent rather than failing.
pub trait SnapshotCache: Send + Sync {
    fn write(&self, key: &str, snapshot: &CacheSnapshot);
    fn read(&self, key: &str) -> Option<CacheSnapshot>;
}

/// Source of the current in-memory snapshot, polled at save time so a
/// coalesced save always carries the latest full state.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    /// `None` when no identity is signed in (nothing to persist).
    async fn current_snapshot(&self) -> Option<PersistRequest>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_scopes_by_identity_with_guest_fallback() {
        assert_eq!(cache_key(Some("user-7")), "inventory:user-7");
        assert_eq!(cache_key(None), "inventory:guest");
    }

    #[test]
    fn cache_snapshot_serializes_camel_case() {
        let snapshot = CacheSnapshot {
            inventory: Vec::new(),
            custom_fields: Vec::new(),
            cached_at: Utc::now(),
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("customFields").is_some());
        assert!(json.get("cachedAt").is_some());
    }
}
