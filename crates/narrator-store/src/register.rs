//! The replicated narration register.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use narrator_core::error::NarratorError;
use narrator_core::role::Role;
use narrator_core::state::{SharedState, StatePatch};
use narrator_core::store::{StatePersistence, StateStore, StateSubscription, StateUpdate};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::persistence::MemoryPersistence;

/// Change-channel capacity. A subscriber that falls further behind than
/// this resynchronises to the latest state.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A single logical register holding the world's [`SharedState`].
///
/// Writes are serialized; each one merges its patch, broadcasts the complete
/// merged state to every subscriber, then persists it. Subscribing snapshots
/// the register and joins the change channel under the same lock a write
/// uses to broadcast, so no subscriber misses or repeats a change.
pub struct ReplicatedStateStore {
    register: Mutex<SharedState>,
    changes: broadcast::Sender<SharedState>,
    write_gate: tokio::sync::Mutex<()>,
    persistence: Arc<dyn StatePersistence>,
}

impl std::fmt::Debug for ReplicatedStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicatedStateStore")
            .field("state", &*self.lock_register())
            .field("subscribers", &self.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

impl ReplicatedStateStore {
    /// Creates a store starting from `initial`.
    #[must_use]
    pub fn with_state(initial: SharedState, persistence: Arc<dyn StatePersistence>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            register: Mutex::new(initial),
            changes,
            write_gate: tokio::sync::Mutex::new(()),
            persistence,
        }
    }

    /// Creates a store with the default state and no durable backing.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_state(SharedState::default(), Arc::new(MemoryPersistence::new()))
    }

    /// Opens a store from `persistence`.
    ///
    /// Nothing saved yet, an unreadable document or a malformed one all
    /// yield the default state, so observers never reconcile against an
    /// undefined record.
    #[instrument(skip(persistence))]
    pub async fn open(persistence: Arc<dyn StatePersistence>) -> Self {
        let initial = match persistence.load().await {
            Ok(Some(state)) => {
                info!(narration_id = state.narration.id, "restored shared narration state");
                state
            }
            Ok(None) => {
                info!("no saved narration state, starting from default");
                SharedState::default()
            }
            Err(e) => {
                warn!(error = %e, "saved narration state unusable, starting from default");
                SharedState::default()
            }
        };
        Self::with_state(initial, persistence)
    }

    /// Number of attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn lock_register(&self) -> MutexGuard<'_, SharedState> {
        self.register.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merges `patch` and broadcasts the result. Callers hold the write gate.
    fn commit(&self, patch: &StatePatch) -> SharedState {
        let merged = {
            let mut register = self.lock_register();
            let merged = register.merged(patch);
            register.clone_from(&merged);
            // No receivers is fine: nobody is watching yet.
            let _ = self.changes.send(merged.clone());
            merged
        };
        debug!(
            narration_id = merged.narration.id,
            display = merged.narration.display,
            paused = merged.narration.paused,
            scenery = merged.scenery,
            "shared state updated"
        );
        merged
    }
}

fn authorize(role: Role) -> Result<(), NarratorError> {
    if role.is_privileged() {
        Ok(())
    } else {
        warn!(?role, "rejected shared state write");
        Err(NarratorError::Unauthorized)
    }
}

#[async_trait]
impl StateStore for ReplicatedStateStore {
    fn get(&self) -> SharedState {
        self.lock_register().clone()
    }

    #[instrument(skip(self, patch))]
    async fn set(&self, role: Role, patch: StatePatch) -> Result<SharedState, NarratorError> {
        authorize(role)?;
        let _gate = self.write_gate.lock().await;
        let merged = self.commit(&patch);
        self.persistence.save(&merged).await?;
        Ok(merged)
    }

    #[instrument(skip(self, change))]
    async fn update<'a>(
        &self,
        role: Role,
        change: StateUpdate<'a>,
    ) -> Result<Option<SharedState>, NarratorError> {
        authorize(role)?;
        let _gate = self.write_gate.lock().await;
        let Some(patch) = change(&self.get())? else {
            debug!("update declined, shared state unchanged");
            return Ok(None);
        };
        let merged = self.commit(&patch);
        self.persistence.save(&merged).await?;
        Ok(Some(merged))
    }

    fn subscribe(&self) -> StateSubscription {
        let register = self.lock_register();
        StateSubscription::new(register.clone(), self.changes.subscribe())
    }
}
