//! Identity-scoped sync coordination.
//!
//! The coordinator owns the in-memory session state and the load lifecycle:
//! on sign-in it hydrates from the on-device cache for an instant (possibly
//! stale) paint, guarantees the identity's remote row exists, then performs
//! an authoritative remote fetch that overwrites both memory and cache. Every
//! user mutation is applied through the pure record-model operations, written
//! through to the cache synchronously, and handed to the save scheduler. The
//! coordinator is the sole caller of the scheduler, and all scheduling is a
//! no-op until the first authoritative load completes.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::codec;
use crate::errors::{ParseError, PersistenceError, ValidationError};
use crate::inventory::{
    CustomFieldDefinition, CustomFieldType, CustomFieldValue, InventoryBook, InventoryItem,
    NewItemInput, SkuPolicy,
};

use super::model::{
    cache_key, CacheSnapshot, FlushReason, MutationKind, PersistRequest, RemoteInventoryStore,
    SnapshotCache, SnapshotSource, SyncStatus,
};
use super::scheduler::SaveScheduler;

/// Counts reported by a completed import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub items: usize,
    pub variants: usize,
    pub skipped_rows: usize,
}

#[derive(Default)]
struct SessionState {
    identity: Option<String>,
    book: InventoryBook,
    loaded: bool,
}

/// Snapshot source backed by the coordinator's session state.
struct SessionSnapshotSource {
    session: Arc<Mutex<SessionState>>,
}

#[async_trait::async_trait]
impl SnapshotSource for SessionSnapshotSource {
    async fn current_snapshot(&self) -> Option<PersistRequest> {
        let session = self.session.lock().await;
        // Nothing to persist before the first authoritative load.
        if !session.loaded {
            return None;
        }
        let identity = session.identity.clone()?;
        Some(PersistRequest {
            identity,
            inventory: session.book.items.clone(),
            custom_fields: session.book.custom_fields.clone(),
        })
    }
}

/// How a mutation reaches the scheduler.
enum ScheduleMode {
    /// Debounced; for edits that arrive in bursts.
    Debounce(MutationKind),
    /// Key mutation: mark dirty, then flush on the next tick.
    FlushSoon,
}

/// Orchestrates memory, cache, and remote store for one signed-in identity.
pub struct SyncCoordinator {
    session: Arc<Mutex<SessionState>>,
    remote: Arc<dyn RemoteInventoryStore>,
    cache: Arc<dyn SnapshotCache>,
    scheduler: SaveScheduler,
    sku_policy: SkuPolicy,
}

impl SyncCoordinator {
    pub fn new(remote: Arc<dyn RemoteInventoryStore>, cache: Arc<dyn SnapshotCache>) -> Self {
        let session = Arc::new(Mutex::new(SessionState::default()));
        let source = Arc::new(SessionSnapshotSource {
            session: Arc::clone(&session),
        });
        let scheduler = SaveScheduler::new(Arc::clone(&remote), source);
        Self {
            session,
            remote,
            cache,
            scheduler,
            sku_policy: SkuPolicy::default(),
        }
    }

    /// Opt into SKU-uniqueness enforcement for manual edits.
    pub fn with_sku_policy(mut self, policy: SkuPolicy) -> Self {
        self.sku_policy = policy;
        self
    }

    /// Override the scheduler's debounce delays. Used by tests.
    pub fn with_save_delays(
        mut self,
        typing: std::time::Duration,
        change: std::time::Duration,
    ) -> Self {
        self.scheduler = self.scheduler.with_delays(typing, change);
        self
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Load the signed-in identity's inventory.
    ///
    /// Cache hydration happens first so the user sees something instantly;
    /// the remote result always wins over the cache on divergence. On remote
    /// failure the error is surfaced and `loaded` stays false, so no save can
    /// overwrite the remote row with a half-hydrated state.
    pub async fn sign_in(&self, identity: &str) -> Result<(), PersistenceError> {
        self.scheduler.reset().await;
        {
            let mut session = self.session.lock().await;
            session.identity = Some(identity.to_string());
            session.loaded = false;
            session.book = match self.cache.read(&cache_key(Some(identity))) {
                Some(snapshot) => {
                    debug!(
                        "[InventorySync] Hydrated {} cached items for '{}'",
                        snapshot.inventory.len(),
                        identity
                    );
                    InventoryBook::new(snapshot.inventory, snapshot.custom_fields)
                }
                None => InventoryBook::default(),
            };
        }

        self.remote.ensure_row(identity).await?;
        let row = self.remote.read_row(identity).await?;

        let mut session = self.session.lock().await;
        if session.identity.as_deref() != Some(identity) {
            // Identity changed while the load was in flight; discard.
            debug!("[InventorySync] Discarding stale load for '{}'", identity);
            return Ok(());
        }
        session.book = match row {
            Some(row) => InventoryBook::new(row.inventory, row.custom_fields),
            None => InventoryBook::default(),
        };
        self.write_through(&session);
        session.loaded = true;
        info!(
            "[InventorySync] Loaded {} items for '{}'",
            session.book.items.len(),
            identity
        );
        Ok(())
    }

    /// Clear in-memory state and scheduling. The cache entry is retained for
    /// the identity's next sign-in.
    pub async fn sign_out(&self) {
        self.scheduler.reset().await;
        let mut session = self.session.lock().await;
        *session = SessionState::default();
        debug!("[InventorySync] Signed out; session cleared");
    }

    /// Host signal: application entering background. Best-effort flush.
    pub async fn handle_app_background(&self) {
        if let Err(err) = self.scheduler.flush_now(FlushReason::AppBackground).await {
            warn!("[InventorySync] Background flush failed: {}", err);
        }
    }

    /// Host signal: application about to terminate. Best-effort flush with no
    /// completion guarantee.
    pub async fn handle_app_terminate(&self) {
        if let Err(err) = self.scheduler.flush_now(FlushReason::AppTerminate).await {
            warn!("[InventorySync] Terminate flush failed: {}", err);
        }
    }

    /// Force an immediate save of the current snapshot.
    pub async fn flush(&self) -> Result<bool, PersistenceError> {
        self.scheduler.flush_now(FlushReason::Manual).await
    }

    pub async fn status(&self) -> SyncStatus {
        let (dirty, saving) = self.scheduler.flags().await;
        let loaded = self.session.lock().await.loaded;
        SyncStatus {
            loaded,
            dirty,
            saving,
        }
    }

    pub async fn items(&self) -> Vec<InventoryItem> {
        self.session.lock().await.book.items.clone()
    }

    pub async fn custom_fields(&self) -> Vec<CustomFieldDefinition> {
        self.session.lock().await.book.custom_fields.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    pub async fn add_item(&self, input: NewItemInput) -> Result<String, ValidationError> {
        let policy = self.sku_policy;
        self.mutate(ScheduleMode::FlushSoon, move |book| {
            book.add_item(input, policy)
        })
        .await
    }

    pub async fn delete_item(&self, item_id: &str) -> Result<(), ValidationError> {
        self.mutate(ScheduleMode::FlushSoon, |book| book.delete_item(item_id))
            .await
    }

    pub async fn update_item_title(
        &self,
        item_id: &str,
        title: &str,
    ) -> Result<(), ValidationError> {
        self.mutate(ScheduleMode::Debounce(MutationKind::Typing), |book| {
            book.update_item_title(item_id, title)
        })
        .await
    }

    pub async fn update_item_sku(&self, item_id: &str, sku: &str) -> Result<(), ValidationError> {
        let policy = self.sku_policy;
        self.mutate(ScheduleMode::Debounce(MutationKind::Typing), move |book| {
            book.update_item_sku(item_id, sku, policy)
        })
        .await
    }

    pub async fn update_item_image_url(
        &self,
        item_id: &str,
        image_url: Option<String>,
    ) -> Result<(), ValidationError> {
        self.mutate(ScheduleMode::FlushSoon, move |book| {
            book.update_item_image_url(item_id, image_url)
        })
        .await
    }

    pub async fn add_variant(
        &self,
        item_id: &str,
        size: &str,
        quantity: u32,
        location: &str,
    ) -> Result<String, ValidationError> {
        self.mutate(ScheduleMode::FlushSoon, |book| {
            book.add_variant(item_id, size, quantity, location)
        })
        .await
    }

    pub async fn delete_variant(
        &self,
        item_id: &str,
        variant_id: &str,
    ) -> Result<(), ValidationError> {
        self.mutate(ScheduleMode::FlushSoon, |book| {
            book.delete_variant(item_id, variant_id)
        })
        .await
    }

    pub async fn set_variant_quantity(
        &self,
        item_id: &str,
        variant_id: &str,
        quantity: i64,
    ) -> Result<u32, ValidationError> {
        self.mutate(ScheduleMode::Debounce(MutationKind::Typing), |book| {
            book.set_variant_quantity(item_id, variant_id, quantity)
        })
        .await
    }

    pub async fn adjust_variant_quantity(
        &self,
        item_id: &str,
        variant_id: &str,
        delta: i64,
    ) -> Result<u32, ValidationError> {
        self.mutate(ScheduleMode::Debounce(MutationKind::Typing), |book| {
            book.adjust_variant_quantity(item_id, variant_id, delta)
        })
        .await
    }

    pub async fn set_variant_location(
        &self,
        item_id: &str,
        variant_id: &str,
        location: &str,
    ) -> Result<(), ValidationError> {
        self.mutate(ScheduleMode::Debounce(MutationKind::Typing), |book| {
            book.set_variant_location(item_id, variant_id, location)
        })
        .await
    }

    pub async fn set_variant_size(
        &self,
        item_id: &str,
        variant_id: &str,
        size: &str,
    ) -> Result<(), ValidationError> {
        self.mutate(ScheduleMode::Debounce(MutationKind::Change), |book| {
            book.set_variant_size(item_id, variant_id, size)
        })
        .await
    }

    pub async fn add_custom_field(
        &self,
        label: &str,
        field_type: CustomFieldType,
    ) -> Result<String, ValidationError> {
        self.mutate(ScheduleMode::FlushSoon, |book| {
            book.add_custom_field(label, field_type)
        })
        .await
    }

    pub async fn delete_custom_field(&self, field_id: &str) -> Result<(), ValidationError> {
        self.mutate(ScheduleMode::FlushSoon, |book| {
            book.delete_custom_field(field_id)
        })
        .await
    }

    pub async fn set_custom_field_value(
        &self,
        item_id: &str,
        field_id: &str,
        value: CustomFieldValue,
    ) -> Result<(), ValidationError> {
        self.mutate(ScheduleMode::Debounce(MutationKind::Typing), |book| {
            book.set_custom_field_value(item_id, field_id, value)
        })
        .await
    }

    pub async fn clear_custom_field_value(
        &self,
        item_id: &str,
        field_id: &str,
    ) -> Result<(), ValidationError> {
        self.mutate(ScheduleMode::Debounce(MutationKind::Typing), |book| {
            book.clear_custom_field_value(item_id, field_id)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Import / export
    // ─────────────────────────────────────────────────────────────────────

    /// Import delimited text. Parsed items replace existing items sharing
    /// their SKU and append otherwise. A key mutation.
    pub async fn import_tabular(&self, text: &str) -> Result<ImportSummary, ParseError> {
        let outcome = codec::parse(text)?;
        let summary = ImportSummary {
            items: outcome.items.len(),
            variants: outcome.items.iter().map(|item| item.variants.len()).sum(),
            skipped_rows: outcome.skipped_rows,
        };

        let loaded = {
            let mut session = self.session.lock().await;
            for item in outcome.items {
                match session
                    .book
                    .items
                    .iter_mut()
                    .find(|existing| existing.sku == item.sku)
                {
                    Some(existing) => *existing = item,
                    None => session.book.items.push(item),
                }
            }
            self.write_through(&session);
            session.loaded
        };
        self.schedule(loaded, ScheduleMode::FlushSoon).await;
        info!(
            "[InventorySync] Imported {} items ({} rows skipped)",
            summary.items, summary.skipped_rows
        );
        Ok(summary)
    }

    /// Export the current inventory as delimited text.
    pub async fn export_tabular(&self) -> String {
        let session = self.session.lock().await;
        codec::serialize(&session.book.items)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    async fn mutate<T>(
        &self,
        mode: ScheduleMode,
        op: impl FnOnce(&mut InventoryBook) -> Result<T, ValidationError>,
    ) -> Result<T, ValidationError> {
        let (value, loaded) = {
            let mut session = self.session.lock().await;
            let value = op(&mut session.book)?;
            self.write_through(&session);
            (value, session.loaded)
        };
        self.schedule(loaded, mode).await;
        Ok(value)
    }

    /// Mirror the in-memory state to the cache before the mutation returns.
    fn write_through(&self, session: &SessionState) {
        let key = cache_key(session.identity.as_deref());
        self.cache
            .write(&key, &CacheSnapshot::of_book(&session.book, Utc::now()));
    }

    async fn schedule(&self, loaded: bool, mode: ScheduleMode) {
        if !loaded {
            debug!("[InventorySync] Skipping schedule before initial load");
            return;
        }
        match mode {
            ScheduleMode::Debounce(kind) => self.scheduler.mark_dirty(kind).await,
            ScheduleMode::FlushSoon => {
                self.scheduler.mark_dirty(MutationKind::Change).await;
                let scheduler = self.scheduler.clone();
                tokio::spawn(async move {
                    if let Err(err) = scheduler.flush_now(FlushReason::KeyMutation).await {
                        warn!("[InventorySync] Immediate save failed: {}", err);
                    }
                });
            }
        }
    }
}
