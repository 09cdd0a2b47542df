//! Draft state machine: the orchestrating component of the sync engine.
//!
//! Owns the current draft and the sync status, and wires the durable slot,
//! cross-tab channel, debounce scheduler, and connectivity monitor into one
//! lifecycle:
//!
//! user input -> `update_draft` merges in memory -> write-through save to
//! the local slot -> cross-tab publish -> debounce timer armed -> on fire,
//! one network write; success lands on `Synced`, failure on `Error` and
//! waits for the next mutation or a connectivity-restored signal.
//!
//! One engine instance exists per active wizard session and is passed down
//! explicitly; there is no global instance.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::bus::{DraftChannel, Subscription};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::debounce::Debouncer;
use crate::models::{Draft, DraftFields, LocalRecord, OwnerId, StatusSnapshot, SyncStatus};
use crate::slot::{DurableSlot, LocalPersistence};
use crate::store::DraftStore;

/// Outcome of [`DraftEngine::hydrate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// A local record was adopted; the wizard resumes where it left off
    Resumed,
    /// No usable local record (absent, foreign owner, or stale)
    Fresh,
}

struct EngineState {
    draft: Draft,
    status: SyncStatus,
    last_synced_at: Option<i64>,
    durable: bool,
}

struct Shared<S> {
    config: EngineConfig,
    slot_key: String,
    store: S,
    slot: DurableSlot<Arc<dyn LocalPersistence>>,
    bus: Arc<dyn DraftChannel>,
    clock: Arc<dyn Clock>,
    debouncer: Debouncer,
    state: Mutex<EngineState>,
    status_tx: watch::Sender<StatusSnapshot>,
}

impl<S: DraftStore + 'static> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        // Inherit the state on poison; no invariant spans a panic here.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn push_status(&self) {
        let snapshot = {
            let state = self.lock();
            StatusSnapshot {
                status: state.status,
                last_synced_at: state.last_synced_at,
                durable: state.durable,
            }
        };
        self.status_tx.send_replace(snapshot);
    }

    /// Arm (or re-arm) the debounce timer; on fire, one sync attempt runs.
    fn arm_debounce(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.debouncer.schedule(self.config.debounce_window(), move || {
            if let Some(shared) = weak.upgrade() {
                tokio::spawn(Self::sync_once(shared));
            }
        });
    }

    /// One network write attempt: the sync executor.
    ///
    /// Never retries by itself; retry is driven by the next mutation's
    /// debounce fire or the connectivity watcher.
    async fn sync_once(self: Arc<Self>) {
        let snapshot = {
            let mut state = self.lock();
            if state.status == SyncStatus::Syncing {
                // An attempt is already in flight; try again after another
                // quiet period instead of racing it.
                drop(state);
                self.arm_debounce();
                return;
            }
            state.status = SyncStatus::Syncing;
            state.draft.clone()
        };
        self.push_status();
        tracing::debug!(
            owner = %snapshot.owner_id,
            version = snapshot.version,
            "Syncing draft to remote store"
        );

        let attempt = tokio::time::timeout(
            self.config.sync_timeout(),
            self.store.save_draft(snapshot.clone()),
        )
        .await;

        match attempt {
            Ok(Ok(ack)) => {
                {
                    let mut state = self.lock();
                    if state.draft.owner_id != snapshot.owner_id {
                        // The session was discarded/re-keyed mid-flight;
                        // apply nothing.
                        return;
                    }
                    state.last_synced_at = Some(ack.accepted_at);
                    if state.draft.version == snapshot.version {
                        state.status = SyncStatus::Synced;
                    }
                    // A newer mutation superseded the snapshot: its own
                    // debounce fire is already armed, leave status alone.
                }
                if let Err(error) = self.slot.confirm(snapshot.version, ack.accepted_at) {
                    tracing::warn!("Failed to record sync confirmation locally: {error}");
                }
                self.push_status();
                tracing::debug!(version = snapshot.version, "Draft synced");
            }
            Ok(Err(error)) => {
                tracing::warn!("Draft sync failed: {error}");
                self.mark_sync_failed();
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.sync_timeout_ms,
                    "Draft sync timed out"
                );
                self.mark_sync_failed();
            }
        }
    }

    fn mark_sync_failed(&self) {
        {
            let mut state = self.lock();
            // A mutation that landed mid-flight already moved us back to
            // Idle and armed the timer; keep that.
            if state.status == SyncStatus::Syncing {
                state.status = SyncStatus::Error;
            }
        }
        self.push_status();
    }

    /// Cross-tab adoption: take the incoming record only if it is strictly
    /// fresher than what this tab holds. An older record arriving later
    /// never wins, and our own published records are rejected as ties.
    fn adopt(&self, incoming: &LocalRecord) {
        let mut state = self.lock();
        if incoming.draft.owner_id != state.draft.owner_id {
            return;
        }
        if incoming.draft.is_fresher_than(&state.draft) {
            tracing::debug!(
                version = incoming.draft.version,
                "Adopting fresher draft from another tab"
            );
            state.draft = incoming.draft.clone();
        }
    }
}

/// The wizard-facing sync engine. One instance per active wizard session,
/// constructed by the session root and passed down.
pub struct DraftEngine<S: DraftStore + 'static> {
    shared: Arc<Shared<S>>,
    // Held for their Drop side effects: unsubscribe and stop watching.
    bus_subscription: Option<Subscription>,
    connectivity_task: Option<JoinHandle<()>>,
}

impl<S: DraftStore + 'static> DraftEngine<S> {
    /// Wire up an engine for `owner_id`'s draft.
    ///
    /// `connectivity` is the receive side of a
    /// [`crate::connectivity::ConnectivityMonitor`]; the engine reacts to
    /// its offline-to-online edges with an immediate recovery sync. Must be
    /// called within a tokio runtime.
    pub fn new(
        config: EngineConfig,
        owner_id: OwnerId,
        store: S,
        persistence: Arc<dyn LocalPersistence>,
        bus: Arc<dyn DraftChannel>,
        connectivity: watch::Receiver<bool>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let slot_key = config.slot_key(&owner_id);
        let draft = Draft::new(owner_id, clock.now_ms());
        let (status_tx, _) = watch::channel(StatusSnapshot::new());

        let shared = Arc::new(Shared {
            config,
            slot_key: slot_key.clone(),
            store,
            slot: DurableSlot::new(Arc::clone(&persistence), slot_key.clone()),
            bus: Arc::clone(&bus),
            clock,
            debouncer: Debouncer::new(),
            state: Mutex::new(EngineState {
                draft,
                status: SyncStatus::Idle,
                last_synced_at: None,
                durable: true,
            }),
            status_tx,
        });

        let weak = Arc::downgrade(&shared);
        let bus_subscription = bus.subscribe(
            &slot_key,
            Box::new(move |incoming| {
                if let Some(shared) = weak.upgrade() {
                    shared.adopt(incoming);
                }
            }),
        );

        let connectivity_task = tokio::spawn(Self::watch_connectivity(
            Arc::downgrade(&shared),
            connectivity,
        ));

        Self {
            shared,
            bus_subscription: Some(bus_subscription),
            connectivity_task: Some(connectivity_task),
        }
    }

    /// Recovery loop: on each offline-to-online edge, bypass the debounce
    /// window and sync whatever is pending right away.
    async fn watch_connectivity(
        weak: std::sync::Weak<Shared<S>>,
        mut connectivity: watch::Receiver<bool>,
    ) {
        let mut was_online = *connectivity.borrow();
        while connectivity.changed().await.is_ok() {
            let online = *connectivity.borrow_and_update();
            let came_back = online && !was_online;
            was_online = online;
            if !came_back {
                continue;
            }
            let Some(shared) = weak.upgrade() else { break };
            let pending = {
                let state = shared.lock();
                state.draft.version > 0 && state.status != SyncStatus::Synced
            };
            if pending {
                tracing::info!("Connectivity restored; starting recovery sync");
                shared.debouncer.cancel();
                Shared::sync_once(shared).await;
            }
        }
    }

    /// Called once at wizard mount: adopt the local record if it belongs to
    /// this owner and is within the staleness bound, otherwise start empty.
    pub fn hydrate(&self) -> Hydration {
        let Some(record) = self.shared.slot.load() else {
            return Hydration::Fresh;
        };
        let now = self.shared.clock.now_ms();
        if now.saturating_sub(record.saved_at) > self.shared.config.staleness_bound_ms {
            tracing::info!(
                saved_at = record.saved_at,
                "Ignoring stale local draft record"
            );
            return Hydration::Fresh;
        }

        let mut state = self.shared.lock();
        if record.draft.owner_id != state.draft.owner_id {
            return Hydration::Fresh;
        }
        if !record.draft.is_fresher_than(&state.draft) {
            return Hydration::Fresh;
        }
        tracing::debug!(version = record.draft.version, "Resuming local draft");
        state.draft = record.draft;
        Hydration::Resumed
    }

    /// Merge `partial` into the draft, write through to the local slot,
    /// notify other tabs, and arm the debounce timer. Returns immediately;
    /// never errors, even for unknown field names or a failed local save.
    pub fn update_draft(&self, partial: DraftFields) {
        let now = self.shared.clock.now_ms();
        let record = {
            let mut state = self.shared.lock();
            state.draft.apply(partial, now);
            state.status = SyncStatus::Idle;
            let record = LocalRecord::new(state.draft.clone(), now);
            match self.shared.slot.save(&record) {
                Ok(()) => {
                    state.durable = true;
                    Some(record)
                }
                Err(error) => {
                    // In-memory draft stays authoritative for this tab;
                    // surface the failure on the status stream only.
                    tracing::warn!("Local draft save failed: {error}");
                    state.durable = false;
                    None
                }
            }
        };
        if let Some(record) = &record {
            self.shared.bus.publish(&self.shared.slot_key, record);
        }
        self.shared.push_status();
        self.shared.arm_debounce();
    }

    /// Current status plus the last remote acknowledgement time.
    #[must_use]
    pub fn sync_status(&self) -> StatusSnapshot {
        let state = self.shared.lock();
        StatusSnapshot {
            status: state.status,
            last_synced_at: state.last_synced_at,
            durable: state.durable,
        }
    }

    /// Status stream for UI indicators ("Syncing…", "Draft Saved", …).
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.shared.status_tx.subscribe()
    }

    /// Current draft snapshot.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.shared.lock().draft.clone()
    }

    /// Run one sync attempt to completion, bypassing the debounce window.
    /// This is the awaitable surface used by recovery flows and tests.
    pub async fn sync_now(&self) {
        self.shared.debouncer.cancel();
        Shared::sync_once(Arc::clone(&self.shared)).await;
    }

    /// Explicit discard by the owning feature: clear the local slot and
    /// start an empty draft. The engine never does this implicitly.
    pub fn discard(&self) {
        self.shared.debouncer.cancel();
        self.shared.slot.clear();
        let owner_id = {
            let mut state = self.shared.lock();
            let owner_id = state.draft.owner_id.clone();
            state.draft = Draft::new(owner_id.clone(), self.shared.clock.now_ms());
            state.status = SyncStatus::Idle;
            state.last_synced_at = None;
            owner_id
        };
        self.shared.push_status();
        tracing::info!(owner = %owner_id, "Draft discarded");
    }

    /// Unmount: cancel the pending timer, stop the connectivity watcher,
    /// and drop the cross-tab subscription. An in-flight sync may still
    /// complete; its result is applied defensively.
    pub fn shutdown(&mut self) {
        self.shared.debouncer.cancel();
        if let Some(task) = self.connectivity_task.take() {
            task.abort();
        }
        self.bus_subscription.take();
    }
}

impl<S: DraftStore + 'static> Drop for DraftEngine<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
