//! Narrator — publisher bounded context.
//!
//! Turns the narrator's intent (a narration, a description, a notification,
//! a pause or scenery toggle) into chat messages and shared state writes.

pub mod application;
pub mod domain;
