//! Narrator — narration lifecycle controller bounded context.
//!
//! Reconciles each client's overlay with the replicated narration record:
//! when to reveal a message, how to scroll it, and when the narrator's client
//! closes it again.

pub mod application;
pub mod domain;
