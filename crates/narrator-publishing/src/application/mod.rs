//! Application layer for publishing.

pub mod chat_hook;
pub mod publisher;
