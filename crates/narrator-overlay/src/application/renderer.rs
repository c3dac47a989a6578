//! Renderer implementations for the overlay.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::domain::render::RenderCommand;

/// Applies render commands to an actual overlay surface.
pub trait OverlayRenderer: Send {
    /// Applies one visual change.
    fn apply(&mut self, command: &RenderCommand);
}

/// Headless renderer that only logs what it would paint.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRenderer;

impl OverlayRenderer for TracingRenderer {
    fn apply(&mut self, command: &RenderCommand) {
        debug!(?command, "render");
    }
}

/// Renderer that records every command, for inspection after the fact.
///
/// Clones share the same record, so a test can keep one clone while the
/// runtime owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    commands: Arc<Mutex<Vec<RenderCommand>>>,
}

impl RecordingRenderer {
    /// Creates an empty recording renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every command applied so far, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<RenderCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OverlayRenderer for RecordingRenderer {
    fn apply(&mut self, command: &RenderCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());
    }
}
