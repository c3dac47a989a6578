//! Test clock — a deterministic `Clock` for chat timestamps.

use chrono::{DateTime, TimeZone, Utc};
use narrator_core::chat::Clock;

/// A clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// The instant every narrator test uses unless it needs its own.
    ///
    /// # Panics
    ///
    /// Never in practice; the literal date is valid.
    #[must_use]
    pub fn session_start() -> Self {
        Self(Utc.with_ymd_and_hms(2026, 1, 15, 20, 0, 0).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
