//! Debounced, dirty-tracked save scheduler.
//!
//! State machine over `{Clean, Dirty, Saving}` realized as `dirty`/`saving`
//! flags plus a pending timer handle. Bursts of mutations coalesce into one
//! remote save carrying the latest full snapshot; a save failure leaves the
//! state dirty so the next trigger retries. An explicit `saving` gate keeps
//! two upserts from ever running concurrently for the same identity: a
//! mutation arriving mid-flight only re-arms, and the completed save arms a
//! follow-up instead of clearing the flag. Cancellation only ever reaches the
//! debounce sleep: a timer detaches its handle before saving, so an in-flight
//! remote call can never be aborted by a later re-arm, flush, or reset.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::errors::PersistenceError;

use super::model::{FlushReason, MutationKind, RemoteInventoryStore, SnapshotSource};

/// Debounce delay for continuous-typing edits (quantity, location, SKU,
/// title, field values).
pub const SAVE_DEBOUNCE_TYPING_MS: u64 = 250;

/// Debounce delay for the general change watcher.
pub const SAVE_DEBOUNCE_CHANGE_MS: u64 = 300;

#[derive(Default)]
struct SchedulerInner {
    dirty: bool,
    saving: bool,
    /// Bumped by every `mark_dirty`; a completed save only clears `dirty`
    /// when no mutation arrived while it was in flight.
    generation: u64,
    /// Identifies the armed timer; a fired timer that no longer matches was
    /// superseded and must not save.
    timer_seq: u64,
    /// The armed debounce sleep, and only the sleep: the timer task removes
    /// itself from here before it starts saving.
    pending: Option<JoinHandle<()>>,
}

/// Schedules and executes persistence calls against the remote store.
///
/// The sync coordinator is the sole caller of [`mark_dirty`](Self::mark_dirty)
/// and [`flush_now`](Self::flush_now).
#[derive(Clone)]
pub struct SaveScheduler {
    remote: Arc<dyn RemoteInventoryStore>,
    source: Arc<dyn SnapshotSource>,
    inner: Arc<Mutex<SchedulerInner>>,
    typing_delay: Duration,
    change_delay: Duration,
}

impl SaveScheduler {
    pub fn new(remote: Arc<dyn RemoteInventoryStore>, source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            remote,
            source,
            inner: Arc::new(Mutex::new(SchedulerInner::default())),
            typing_delay: Duration::from_millis(SAVE_DEBOUNCE_TYPING_MS),
            change_delay: Duration::from_millis(SAVE_DEBOUNCE_CHANGE_MS),
        }
    }

    /// Override the debounce delays. Used by tests.
    pub fn with_delays(mut self, typing: Duration, change: Duration) -> Self {
        self.typing_delay = typing;
        self.change_delay = change;
        self
    }

    /// Record a mutation and (re-)arm the debounce timer. Any pending timer
    /// is canceled first, so a burst of edits fires exactly once.
    pub async fn mark_dirty(&self, kind: MutationKind) {
        let delay = match kind {
            MutationKind::Typing => self.typing_delay,
            MutationKind::Change => self.change_delay,
        };
        let mut inner = self.inner.lock().await;
        inner.dirty = true;
        inner.generation = inner.generation.wrapping_add(1);
        Self::arm_timer(&mut inner, self.clone(), delay);
    }

    /// Cancel any pending timer and, if dirty and not already saving, perform
    /// the save immediately; otherwise a no-op. Returns whether a save ran.
    pub async fn flush_now(&self, reason: FlushReason) -> Result<bool, PersistenceError> {
        {
            let mut inner = self.inner.lock().await;
            if let Some(handle) = inner.pending.take() {
                handle.abort();
            }
        }
        debug!("[InventorySync] Flush requested ({})", reason.as_str());
        self.try_save().await
    }

    /// Current `(dirty, saving)` flags.
    pub async fn flags(&self) -> (bool, bool) {
        let inner = self.inner.lock().await;
        (inner.dirty, inner.saving)
    }

    /// Drop any pending work and return to the clean state. Called on
    /// sign-out and identity change; an in-flight save is not cancelled but
    /// its completion can no longer clear a later identity's dirty flag.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.pending.take() {
            handle.abort();
        }
        inner.dirty = false;
        inner.generation = inner.generation.wrapping_add(1);
        inner.timer_seq = inner.timer_seq.wrapping_add(1);
    }

    fn arm_timer(inner: &mut SchedulerInner, scheduler: SaveScheduler, delay: Duration) {
        if let Some(handle) = inner.pending.take() {
            handle.abort();
        }
        inner.timer_seq = inner.timer_seq.wrapping_add(1);
        let seq = inner.timer_seq;
        inner.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detach from `pending` before saving so a later re-arm, flush,
            // or reset can only cancel the sleep, never the remote call.
            {
                let mut inner = scheduler.inner.lock().await;
                if inner.timer_seq != seq {
                    return;
                }
                inner.pending = None;
            }
            if let Err(err) = scheduler.try_save().await {
                warn!("[InventorySync] Debounced save failed: {}", err);
            }
        }));
    }

    /// Timer-fire / flush body: save the current snapshot unless clean or a
    /// save is already in flight.
    async fn try_save(&self) -> Result<bool, PersistenceError> {
        let generation = {
            let mut inner = self.inner.lock().await;
            if !inner.dirty || inner.saving {
                return Ok(false);
            }
            inner.saving = true;
            inner.generation
        };

        let request = match self.source.current_snapshot().await {
            Some(request) => request,
            None => {
                // No signed-in identity; nothing to persist.
                let mut inner = self.inner.lock().await;
                inner.saving = false;
                return Ok(false);
            }
        };

        let result = self
            .remote
            .save_row(&request.identity, &request.inventory, &request.custom_fields)
            .await;

        let mut inner = self.inner.lock().await;
        inner.saving = false;
        // A mutation that landed mid-flight may have fired its own timer into
        // the `saving` gate; guarantee it a follow-up trigger either way.
        let armed = inner
            .pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false);
        match result {
            Ok(()) => {
                if inner.generation == generation {
                    inner.dirty = false;
                } else if !armed {
                    Self::arm_timer(&mut inner, self.clone(), self.change_delay);
                }
                debug!(
                    "[InventorySync] Saved snapshot for '{}' ({} items)",
                    request.identity,
                    request.inventory.len()
                );
                Ok(true)
            }
            // Stays dirty; the failed save itself is not retried.
            Err(err) => {
                if inner.generation != generation && !armed {
                    Self::arm_timer(&mut inner, self.clone(), self.change_delay);
                }
                Err(err)
            }
        }
    }
}
