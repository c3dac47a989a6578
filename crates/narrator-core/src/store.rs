//! Shared narration state store abstraction.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

use crate::error::NarratorError;
use crate::role::Role;
use crate::state::{SharedState, StatePatch};

/// A read-modify-write step. It receives the current state while the store
/// holds its write lock and returns the patch to merge, or `None` to leave
/// the state untouched.
pub type StateUpdate<'a> =
    Box<dyn FnOnce(&SharedState) -> Result<Option<StatePatch>, NarratorError> + Send + 'a>;

/// The single authoritative register every client observes.
///
/// Implementations must deliver the complete merged state to every
/// subscriber exactly once per successful `set`, in write order, including
/// the writer's own subscriptions.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Returns the current state.
    fn get(&self) -> SharedState;

    /// Merges `patch` into the current state and broadcasts the result.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Unauthorized` if `role` is not privileged,
    /// leaving the state untouched. Returns `NarratorError::Persistence` if
    /// the merged state could not be persisted.
    async fn set(&self, role: Role, patch: StatePatch) -> Result<SharedState, NarratorError>;

    /// Computes a patch from the current state and merges it, with no other
    /// write landing in between. Returns the merged state, or `None` if
    /// `change` declined to write.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Unauthorized` without running `change` if
    /// `role` is not privileged. Propagates any error `change` returns,
    /// leaving the state untouched. Returns `NarratorError::Persistence` if
    /// the merged state could not be persisted.
    async fn update<'a>(
        &self,
        role: Role,
        change: StateUpdate<'a>,
    ) -> Result<Option<SharedState>, NarratorError>;

    /// Attaches a new observer. The subscription yields the current state
    /// first, then every subsequent change.
    fn subscribe(&self) -> StateSubscription;
}

/// Durable backing for the shared state, so a world keeps its narration
/// across restarts.
#[async_trait]
pub trait StatePersistence: Send + Sync {
    /// Loads the last saved state, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Persistence` if the saved state cannot be
    /// read or decoded.
    async fn load(&self) -> Result<Option<SharedState>, NarratorError>;

    /// Saves `state`, replacing whatever was saved before.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Persistence` if the state cannot be written.
    async fn save(&self, state: &SharedState) -> Result<(), NarratorError>;
}

/// A stream of state changes that starts with the state current at attach
/// time.
#[derive(Debug)]
pub struct StateSubscription {
    initial: Option<SharedState>,
    receiver: broadcast::Receiver<SharedState>,
}

impl StateSubscription {
    /// Creates a subscription from the attach-time snapshot and a receiver
    /// subscribed at the same instant.
    #[must_use]
    pub fn new(initial: SharedState, receiver: broadcast::Receiver<SharedState>) -> Self {
        Self {
            initial: Some(initial),
            receiver,
        }
    }

    /// Waits for the next state. Returns `None` once the store is gone.
    ///
    /// A subscriber that fell behind the channel capacity skips straight to
    /// the latest buffered state.
    pub async fn recv(&mut self) -> Option<SharedState> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.receiver.recv().await {
                Ok(state) => return Some(state),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "state subscriber lagged, resynchronising");
                    if let Some(latest) = self.drain_latest() {
                        return Some(latest);
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn drain_latest(&mut self) -> Option<SharedState> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(state) => latest = Some(state),
                Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return latest,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_id(id: u64) -> SharedState {
        let mut state = SharedState::default();
        state.narration.id = id;
        state
    }

    #[tokio::test]
    async fn test_subscription_yields_initial_state_first() {
        // Arrange
        let (sender, receiver) = broadcast::channel(4);
        let mut subscription = StateSubscription::new(state_with_id(1), receiver);
        sender.send(state_with_id(2)).unwrap();

        // Act
        let first = subscription.recv().await.unwrap();
        let second = subscription.recv().await.unwrap();

        // Assert
        assert_eq!(first.narration.id, 1);
        assert_eq!(second.narration.id, 2);
    }

    #[tokio::test]
    async fn test_lagged_subscription_resyncs_to_latest() {
        // Arrange
        let (sender, receiver) = broadcast::channel(2);
        let mut subscription = StateSubscription::new(state_with_id(0), receiver);
        for id in 1..=5 {
            sender.send(state_with_id(id)).unwrap();
        }

        // Act
        subscription.recv().await.unwrap();
        let next = subscription.recv().await.unwrap();

        // Assert
        assert_eq!(next.narration.id, 5);
    }

    #[tokio::test]
    async fn test_subscription_ends_when_store_is_dropped() {
        let (sender, receiver) = broadcast::channel(2);
        let mut subscription = StateSubscription::new(SharedState::default(), receiver);
        drop(sender);

        assert!(subscription.recv().await.is_some());
        assert!(subscription.recv().await.is_none());
    }
}
