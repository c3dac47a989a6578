//! Lifecycle events emitted by a client's controller.

use serde::{Deserialize, Serialize};

/// Emitted when an epoch's content has been revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationOpened {
    /// The epoch that opened.
    pub id: u64,
    /// The revealed text.
    pub message: String,
}

/// Emitted by the narrator's client once it has cleared an epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationClosed {
    /// The epoch that closed.
    pub id: u64,
    /// The text that finished displaying.
    pub message: String,
}

/// Events a controller publishes to local listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Content was revealed.
    Opened(NarrationOpened),
    /// The record was cleared after the display duration.
    Closed(NarrationClosed),
}

impl LifecycleEvent {
    /// The event type name, used in logs.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Opened(_) => "narration.opened",
            Self::Closed(_) => "narration.closed",
        }
    }

    /// The epoch this event belongs to.
    #[must_use]
    pub fn narration_id(&self) -> u64 {
        match self {
            Self::Opened(opened) => opened.id,
            Self::Closed(closed) => closed.id,
        }
    }
}
