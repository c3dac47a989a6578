//! Application layer for the narration overlay: the renderer boundary and
//! the async runtime that drives a controller.

pub mod renderer;
pub mod runtime;
