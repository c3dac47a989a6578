//! The locally painted overlay, as the controller believes it to be.

use std::time::Duration;

use narrator_core::duration::VISIBLE_CONTENT_CAP;
use tokio::time::Instant;

/// A linear scroll animation in flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMotion {
    /// Offset at `started_at`.
    pub from: f64,
    /// Offset once `duration` has elapsed.
    pub to: f64,
    /// When the animation started.
    pub started_at: Instant,
    /// Total animation time.
    pub duration: Duration,
}

impl ScrollMotion {
    /// Interpolated offset at `now`.
    #[must_use]
    pub fn position_at(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return self.to;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        let progress = (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * progress
    }

    /// Returns `true` once the animation has reached `to`.
    #[must_use]
    pub fn is_finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.duration
    }
}

/// Local visual state: scenery dimmer, content box and scroll offset.
#[derive(Debug, Clone, Default)]
pub struct OverlayView {
    /// Painted scenery state; `None` until the first reconciliation.
    pub scenery: Option<bool>,
    /// Whether the content box is faded in.
    pub content_visible: bool,
    /// The text in the content box.
    pub message: String,
    /// Measured height of `message`.
    pub content_height: f64,
    scroll_top: f64,
    motion: Option<ScrollMotion>,
}

impl OverlayView {
    /// Fades `message` in at the top of the content box.
    pub fn show(&mut self, message: String, content_height: f64) {
        self.content_visible = true;
        self.message = message;
        self.content_height = content_height;
        self.scroll_top = 0.0;
        self.motion = None;
    }

    /// Fades the content out and drops any animation.
    pub fn hide(&mut self) {
        self.content_visible = false;
        self.motion = None;
    }

    /// Distance the content must scroll for its tail to be visible.
    #[must_use]
    pub fn overflow(&self) -> f64 {
        (self.content_height - VISIBLE_CONTENT_CAP).max(0.0)
    }

    /// Current top offset (0 at rest, `-overflow` fully scrolled).
    #[must_use]
    pub fn scroll_position(&self, now: Instant) -> f64 {
        self.motion
            .map_or(self.scroll_top, |motion| motion.position_at(now))
    }

    /// Fraction of the scroll distance still ahead, in `[0, 1]`.
    #[must_use]
    pub fn remaining_fraction(&self, now: Instant) -> f64 {
        let overflow = self.overflow();
        if overflow <= 0.0 {
            return 0.0;
        }
        (1.0 - self.scroll_position(now) / -overflow).clamp(0.0, 1.0)
    }

    /// Returns `true` while a scroll animation is moving.
    #[must_use]
    pub fn is_scrolling(&self, now: Instant) -> bool {
        self.motion.is_some_and(|motion| !motion.is_finished(now))
    }

    /// Starts a scroll from the current offset to the fully scrolled one.
    pub fn start_scroll(&mut self, now: Instant, duration: Duration) -> ScrollMotion {
        let motion = ScrollMotion {
            from: self.scroll_position(now),
            to: -self.overflow(),
            started_at: now,
            duration,
        };
        self.motion = Some(motion);
        motion
    }

    /// Freezes any animation at its current offset. Returns the offset if a
    /// moving animation was stopped.
    pub fn freeze(&mut self, now: Instant) -> Option<f64> {
        let motion = self.motion.take()?;
        self.scroll_top = motion.position_at(now);
        (!motion.is_finished(now)).then_some(self.scroll_top)
    }
}
