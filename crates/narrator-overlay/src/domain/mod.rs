//! Domain model for the narration overlay.

pub mod controller;
pub mod events;
pub mod render;
pub mod timers;
pub mod view;
