//! Shared test doubles for the Narrator overlay.

mod chat;
mod clock;
mod persistence;

pub use chat::{FailingChatLog, RecordingChatLog};
pub use clock::FixedClock;
pub use persistence::{FailingPersistence, RecordingPersistence, SlowPersistence};
