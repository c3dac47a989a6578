//! Route modules.

pub mod health;
pub mod narrator;
pub mod stream;
