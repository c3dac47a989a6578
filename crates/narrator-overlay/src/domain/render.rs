//! The rendering boundary: what the controller asks the overlay to paint,
//! and how it learns the height of a message.

use std::time::Duration;

/// A visual change for the overlay renderer. The controller decides what
/// and when; the renderer decides how.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Turn the scenery dimmer fully on or off.
    SetScenery {
        /// Target dimmer state.
        visible: bool,
    },
    /// Shrink the narration background to nothing (start of the fade out).
    CollapseBackground,
    /// Fade the content out and stop any scroll animation.
    HideContent,
    /// Put `message` in the content box at the top and fade it in.
    ShowContent {
        /// The text to show.
        message: String,
    },
    /// Resize the narration background.
    SetBackgroundHeight {
        /// New height in layout units.
        height: f64,
    },
    /// Animate the content's top offset linearly.
    AnimateScroll {
        /// Offset the animation starts from.
        from: f64,
        /// Offset the animation ends at (negative scrolls up).
        to: f64,
        /// How long the animation runs.
        duration: Duration,
    },
    /// Stop the scroll animation in place.
    StopScroll {
        /// Offset the content is frozen at.
        at: f64,
    },
}

/// Reports the rendered height of a message.
pub trait ContentMeasure: Send {
    /// Height `message` occupies in the content box, in layout units.
    fn content_height(&self, message: &str) -> f64;
}

impl<F> ContentMeasure for F
where
    F: Fn(&str) -> f64 + Send,
{
    fn content_height(&self, message: &str) -> f64 {
        self(message)
    }
}

/// Headless measure: wraps each line at a fixed width and multiplies the
/// line count by a fixed line height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMeasure {
    /// Characters that fit on one line.
    pub chars_per_line: usize,
    /// Height of one line in layout units.
    pub line_height: f64,
}

impl Default for LineMeasure {
    fn default() -> Self {
        Self {
            chars_per_line: 60,
            line_height: 31.0,
        }
    }
}

impl ContentMeasure for LineMeasure {
    #[allow(clippy::cast_precision_loss)]
    fn content_height(&self, message: &str) -> f64 {
        if message.is_empty() {
            return 0.0;
        }
        let width = self.chars_per_line.max(1);
        let lines: usize = message
            .split('\n')
            .map(|line| line.chars().count().div_ceil(width).max(1))
            .sum();
        lines as f64 * self.line_height
    }
}
