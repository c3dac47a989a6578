//! World-scoped narrator settings consumed by the overlay and publisher.

use serde::{Deserialize, Serialize};

use crate::error::NarratorError;

/// Settings shared by every client of a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarratorSettings {
    /// Scales every narration duration. Must be positive.
    pub duration_multiplier: f64,
    /// Whether new narrations start with auto-scroll frozen.
    pub start_paused: bool,
    /// Whether pausing the game turns the scenery dimmer on.
    pub pause_links_scenery: bool,
}

impl Default for NarratorSettings {
    fn default() -> Self {
        Self {
            duration_multiplier: 1.0,
            start_paused: false,
            pause_links_scenery: false,
        }
    }
}

impl NarratorSettings {
    /// Set the duration multiplier.
    #[must_use]
    pub fn with_duration_multiplier(mut self, multiplier: f64) -> Self {
        self.duration_multiplier = multiplier;
        self
    }

    /// Set whether narrations start paused.
    #[must_use]
    pub fn with_start_paused(mut self, start_paused: bool) -> Self {
        self.start_paused = start_paused;
        self
    }

    /// Set whether the game pause drives the scenery dimmer.
    #[must_use]
    pub fn with_pause_links_scenery(mut self, linked: bool) -> Self {
        self.pause_links_scenery = linked;
        self
    }

    /// Checks the settings for values the duration model cannot use.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Validation` if the multiplier is not a
    /// positive finite number.
    pub fn validate(&self) -> Result<(), NarratorError> {
        if !self.duration_multiplier.is_finite() || self.duration_multiplier <= 0.0 {
            return Err(NarratorError::Validation(format!(
                "duration multiplier must be positive, got {}",
                self.duration_multiplier
            )));
        }
        Ok(())
    }
}
