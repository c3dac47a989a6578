//! The replicated narration state.

use serde::{Deserialize, Serialize};

use crate::error::NarratorError;

/// The single authoritative narration record shared by every client.
///
/// A change of `id` starts a new epoch; every other field change adjusts the
/// current one. The cleared state is `display == false` with an empty
/// `message`, keeping the last `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationRecord {
    /// Epoch identifier, incremented by every new narration.
    pub id: u64,
    /// Whether the narration box should currently be visible.
    pub display: bool,
    /// Text content. Empty means nothing to show.
    pub message: String,
    /// Whether auto-scroll progression is frozen.
    pub paused: bool,
}

impl NarrationRecord {
    /// Builds the record for a new epoch following `previous`.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Validation` if `previous` already holds the
    /// last representable epoch id.
    pub fn next_epoch(
        previous: &Self,
        message: impl Into<String>,
        paused: bool,
    ) -> Result<Self, NarratorError> {
        let id = previous.id.checked_add(1).ok_or_else(|| {
            NarratorError::Validation(format!("narration id {} cannot advance", previous.id))
        })?;
        Ok(Self {
            id,
            display: true,
            message: message.into(),
            paused,
        })
    }

    /// Returns the cleared form of this record: hidden, empty, same id.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self {
            id: self.id,
            display: false,
            message: String::new(),
            paused: self.paused,
        }
    }

    /// Returns `true` while a narration is shown with content.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.display && !self.message.is_empty()
    }
}

/// Everything the narrator replicates: the narration record and the scenery
/// dimmer flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedState {
    /// The current narration record.
    pub narration: NarrationRecord,
    /// Whether the background scenery dimmer is on.
    pub scenery: bool,
}

impl SharedState {
    /// Merges `patch` into a copy of this state. Unspecified fields are
    /// preserved.
    #[must_use]
    pub fn merged(&self, patch: &StatePatch) -> Self {
        Self {
            narration: patch
                .narration
                .clone()
                .unwrap_or_else(|| self.narration.clone()),
            scenery: patch.scenery.unwrap_or(self.scenery),
        }
    }
}

/// A partial update to [`SharedState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePatch {
    /// Replacement narration record, if any.
    pub narration: Option<NarrationRecord>,
    /// Replacement scenery flag, if any.
    pub scenery: Option<bool>,
}

impl StatePatch {
    /// A patch replacing only the narration record.
    #[must_use]
    pub fn narration(record: NarrationRecord) -> Self {
        Self {
            narration: Some(record),
            scenery: None,
        }
    }

    /// A patch replacing only the scenery flag.
    #[must_use]
    pub fn scenery(scenery: bool) -> Self {
        Self {
            narration: None,
            scenery: Some(scenery),
        }
    }
}
