//! Test persistence backends — mock `StatePersistence` implementations.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use narrator_core::error::NarratorError;
use narrator_core::state::SharedState;
use narrator_core::store::StatePersistence;

/// Persistence that starts from a configured state and records every save.
#[derive(Debug, Default)]
pub struct RecordingPersistence {
    initial: Option<SharedState>,
    saved: Mutex<Vec<SharedState>>,
}

impl RecordingPersistence {
    /// Creates a backend whose `load` returns `initial`.
    #[must_use]
    pub fn new(initial: Option<SharedState>) -> Self {
        Self {
            initial,
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Returns every state passed to `save`, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved(&self) -> Vec<SharedState> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatePersistence for RecordingPersistence {
    async fn load(&self) -> Result<Option<SharedState>, NarratorError> {
        Ok(self.initial.clone())
    }

    async fn save(&self, state: &SharedState) -> Result<(), NarratorError> {
        self.saved.lock().unwrap().push(state.clone());
        Ok(())
    }
}

/// Persistence that fails every load and save. Useful for testing that
/// replication survives a broken disk.
#[derive(Debug)]
pub struct FailingPersistence;

#[async_trait]
impl StatePersistence for FailingPersistence {
    async fn load(&self) -> Result<Option<SharedState>, NarratorError> {
        Err(NarratorError::Persistence("disk unavailable".into()))
    }

    async fn save(&self, _state: &SharedState) -> Result<(), NarratorError> {
        Err(NarratorError::Persistence("disk unavailable".into()))
    }
}

/// Persistence whose saves take `delay` to finish. The store keeps its write
/// lock across a save, so this widens the window in which concurrent writers
/// queue up behind one another.
#[derive(Debug)]
pub struct SlowPersistence {
    delay: Duration,
    saved: Mutex<Vec<SharedState>>,
}

impl SlowPersistence {
    /// Creates a backend whose every `save` sleeps for `delay` first.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Returns every state passed to `save`, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved(&self) -> Vec<SharedState> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatePersistence for SlowPersistence {
    async fn load(&self) -> Result<Option<SharedState>, NarratorError> {
        Ok(None)
    }

    async fn save(&self, state: &SharedState) -> Result<(), NarratorError> {
        tokio::time::sleep(self.delay).await;
        self.saved.lock().unwrap().push(state.clone());
        Ok(())
    }
}
