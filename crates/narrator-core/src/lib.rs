//! Narrator Core — shared narration abstractions.
//!
//! This crate defines the replicated narration record, the state store
//! contract every client observes, the duration model and the ports the
//! overlay and publisher depend on. It contains no infrastructure code.

pub mod chat;
pub mod duration;
pub mod error;
pub mod role;
pub mod settings;
pub mod state;
pub mod store;
