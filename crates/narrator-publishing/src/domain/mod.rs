//! Domain model for publishing: chat commands and message formatting.

pub mod commands;
pub mod message;
