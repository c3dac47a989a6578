//! Narrator store — the replicated narration register and its backends.

pub mod chat_log;
pub mod persistence;
pub mod register;

pub use chat_log::InMemoryChatLog;
pub use persistence::{JsonFilePersistence, MemoryPersistence};
pub use register::ReplicatedStateStore;
