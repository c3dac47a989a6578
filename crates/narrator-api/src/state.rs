//! Shared application state.

use std::sync::Arc;

use narrator_core::chat::{ChatLog, Clock};
use narrator_core::role::Role;
use narrator_core::settings::NarratorSettings;
use narrator_core::store::StateStore;
use narrator_overlay::application::renderer::TracingRenderer;
use narrator_overlay::application::runtime::{ControllerHandle, ControllerRuntime};
use narrator_overlay::domain::controller::LifecycleController;
use narrator_overlay::domain::render::LineMeasure;
use narrator_publishing::application::chat_hook::ChatHook;
use narrator_publishing::application::publisher::Publisher;
use tokio::task::JoinHandle;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The shared narration register.
    pub store: Arc<dyn StateStore>,
    /// The narrator's publisher.
    pub publisher: Publisher,
    /// Chat command boundary.
    pub chat_hook: ChatHook,
    /// Handle to the server-side narrator controller.
    pub controller: ControllerHandle,
}

impl AppState {
    /// Starts the narrator's controller on `store` and builds the state
    /// around it. The server hosts the narrator client, so it is the one
    /// that closes narrations.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        store: Arc<dyn StateStore>,
        chat_log: Arc<dyn ChatLog>,
        clock: Arc<dyn Clock>,
        settings: NarratorSettings,
    ) -> (Self, JoinHandle<()>) {
        let controller = LifecycleController::new(
            Role::Narrator,
            settings.clone(),
            Box::new(LineMeasure::default()),
        );
        let (handle, task) =
            ControllerRuntime::spawn(controller, Arc::clone(&store), Box::new(TracingRenderer));
        let publisher = Publisher::new(
            Arc::clone(&store),
            chat_log,
            handle.clone(),
            clock,
            settings,
        );
        let state = Self {
            store,
            chat_hook: ChatHook::new(publisher.clone()),
            publisher,
            controller: handle,
        };
        (state, task)
    }
}
