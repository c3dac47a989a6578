//! Reading-time model for narration messages.
//!
//! Every timing constant the overlay uses lives here so the reveal, scroll
//! and close phases stay consistent with the total display duration.

use std::time::Duration;

/// Milliseconds of reading time per character.
pub const MS_PER_CHARACTER: f64 = 80.0;
/// Lower bound on reading time.
pub const MIN_READING_MS: f64 = 2000.0;
/// Upper bound on reading time.
pub const MAX_READING_MS: f64 = 20000.0;
/// Open and scroll animation allowance, scaled by the multiplier.
pub const ANIMATION_OVERHEAD_MS: f64 = 3000.0;
/// Unscaled tail added after everything else.
pub const EPILOGUE_MS: f64 = 500.0;

/// Delay between a new epoch arriving and its content being revealed.
pub const REVEAL_DELAY: Duration = Duration::from_millis(500);
/// Settle delay before scrolling starts, scaled by the multiplier.
pub const SCROLL_SETTLE_MS: f64 = 3000.0;
/// Part of the duration not available to the scroll animation, scaled by
/// the multiplier (the epilogue is added on top).
pub const SCROLL_OVERHEAD_MS: f64 = 5000.0;

/// Tallest content shown without scrolling, in layout units.
pub const VISIBLE_CONTENT_CAP: f64 = 310.0;
/// Background height relative to the visible content height.
pub const BACKGROUND_PARALLAX: f64 = 3.0;

/// Returns how long a message of `length` characters stays on screen.
///
/// `clamp(length × 80, 2000, 20000) + 3000` milliseconds, scaled by
/// `multiplier`, plus a fixed 500 ms.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn message_duration(length: usize, multiplier: f64) -> Duration {
    let reading = (length as f64 * MS_PER_CHARACTER).clamp(MIN_READING_MS, MAX_READING_MS);
    millis((reading + ANIMATION_OVERHEAD_MS) * multiplier + EPILOGUE_MS)
}

/// Delay between reveal and the start of the scroll animation.
#[must_use]
pub fn scroll_settle_delay(multiplier: f64) -> Duration {
    millis(SCROLL_SETTLE_MS * multiplier)
}

/// Time budget of a full top-to-tail scroll for a message of `length`
/// characters.
#[must_use]
pub fn scroll_budget(length: usize, multiplier: f64) -> Duration {
    message_duration(length, multiplier)
        .saturating_sub(millis(SCROLL_OVERHEAD_MS * multiplier + EPILOGUE_MS))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn millis(ms: f64) -> Duration {
    Duration::from_nanos((ms.max(0.0) * 1_000_000.0).round() as u64)
}
