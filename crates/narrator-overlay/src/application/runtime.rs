//! The async runtime that drives one client's lifecycle controller.
//!
//! A runtime task owns the controller. It waits on three sources at once:
//! control commands from its handle, state changes from the store and the
//! controller's next phase deadline. Every output is applied before the next
//! input is taken, so the controller never observes a half-applied step.

use std::sync::Arc;

use narrator_core::error::NarratorError;
use narrator_core::state::{SharedState, StatePatch};
use narrator_core::store::{StateStore, StateSubscription, StateUpdate};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::application::renderer::OverlayRenderer;
use crate::domain::controller::{ControllerOutput, LifecycleController};
use crate::domain::events::{LifecycleEvent, NarrationClosed};

/// Capacity of the lifecycle event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

const COMMAND_CHANNEL_CAPACITY: usize = 8;

#[derive(Debug)]
enum ControlCommand {
    CancelPending { ack: oneshot::Sender<()> },
    Shutdown,
}

/// Cloneable handle to a running controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<ControlCommand>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl ControllerHandle {
    /// Cancels every pending phase of the controller. Resolves once the
    /// runtime has done so, so a write issued afterwards cannot race an
    /// orphaned close.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::ChannelClosed` if the runtime has stopped.
    pub async fn cancel_pending(&self) -> Result<(), NarratorError> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(ControlCommand::CancelPending { ack })
            .await
            .map_err(|_| NarratorError::ChannelClosed("controller runtime"))?;
        done.await
            .map_err(|_| NarratorError::ChannelClosed("controller runtime"))
    }

    /// Subscribes to the controller's lifecycle events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Asks the runtime to stop. Pending phases are dropped.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::ChannelClosed` if the runtime has already
    /// stopped.
    pub async fn shutdown(&self) -> Result<(), NarratorError> {
        self.commands
            .send(ControlCommand::Shutdown)
            .await
            .map_err(|_| NarratorError::ChannelClosed("controller runtime"))
    }
}

/// Owns a [`LifecycleController`] and applies its outputs.
pub struct ControllerRuntime {
    controller: LifecycleController,
    store: Arc<dyn StateStore>,
    renderer: Box<dyn OverlayRenderer>,
    subscription: StateSubscription,
    commands: mpsc::Receiver<ControlCommand>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl ControllerRuntime {
    /// Attaches `controller` to `store` and starts driving it on a new task.
    ///
    /// The store subscription is taken before this returns, so any write
    /// made after `spawn` is observed by the controller.
    #[must_use]
    pub fn spawn(
        controller: LifecycleController,
        store: Arc<dyn StateStore>,
        renderer: Box<dyn OverlayRenderer>,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let subscription = store.subscribe();
        let (command_tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let span = info_span!("controller_runtime", role = ?controller.role());

        let runtime = Self {
            controller,
            store,
            renderer,
            subscription,
            commands,
            events: events.clone(),
        };
        let task = tokio::spawn(runtime.run().instrument(span));
        let handle = ControllerHandle {
            commands: command_tx,
            events,
        };
        (handle, task)
    }

    async fn run(mut self) {
        info!("controller attached");
        loop {
            let deadline = self.controller.next_deadline();
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(ControlCommand::CancelPending { ack }) => {
                        self.controller.cancel_pending();
                        // The caller may have given up waiting.
                        let _ = ack.send(());
                    }
                    Some(ControlCommand::Shutdown) | None => break,
                },
                state = self.subscription.recv() => {
                    let Some(state) = state else {
                        warn!("state store closed");
                        break;
                    };
                    let outputs = self.controller.reconcile(&state, Instant::now());
                    self.dispatch(outputs).await;
                }
                () = wait_until(deadline) => {
                    let outputs = self.controller.fire_due(Instant::now());
                    self.dispatch(outputs).await;
                }
            }
        }
        info!("controller detached");
    }

    async fn dispatch(&mut self, outputs: Vec<ControllerOutput>) {
        for output in outputs {
            match output {
                ControllerOutput::Render(command) => self.renderer.apply(&command),
                ControllerOutput::Event(event) => self.publish(event),
                ControllerOutput::CloseDue { id, message } => {
                    self.close_narration(id, message).await;
                }
            }
        }
    }

    fn publish(&self, event: LifecycleEvent) {
        debug!(
            event_type = event.event_type(),
            narration_id = event.narration_id(),
            "lifecycle event"
        );
        // No listeners is fine.
        let _ = self.events.send(event);
    }

    /// Clears epoch `id` if it is still the current one, then announces the
    /// close. A persistence failure still counts as closed: the cleared
    /// record has already been replicated.
    async fn close_narration(&mut self, id: u64, message: String) {
        let clear: StateUpdate<'static> = Box::new(move |state: &SharedState| {
            let current = &state.narration;
            if current.id != id || !current.display {
                return Ok(None);
            }
            Ok(Some(StatePatch::narration(current.cleared())))
        });
        match self.store.update(self.controller.role(), clear).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!(narration_id = id, "stale close skipped");
                return;
            }
            Err(NarratorError::Persistence(reason)) => {
                warn!(narration_id = id, %reason, "cleared narration not persisted");
            }
            Err(e) => {
                error!(narration_id = id, error = %e, "failed to clear narration");
                return;
            }
        }
        info!(narration_id = id, "narration closed");
        self.publish(LifecycleEvent::Closed(NarrationClosed { id, message }));
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
