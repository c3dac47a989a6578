//! The narrator's publishing service.
//!
//! Every operation here is a no-op for non-privileged roles: a player who
//! reaches for the narrator's tools gets nothing, not an error.

use std::sync::Arc;

use narrator_core::chat::{ChatLog, ChatMessage, Clock, MessageKind};
use narrator_core::error::NarratorError;
use narrator_core::role::Role;
use narrator_core::settings::NarratorSettings;
use narrator_core::state::{NarrationRecord, SharedState, StatePatch};
use narrator_core::store::{StateStore, StateUpdate};
use narrator_overlay::application::runtime::ControllerHandle;
use narrator_overlay::domain::events::LifecycleEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::message::{PublishOptions, chat_content, normalize_text};

/// What a publish call did.
#[derive(Debug)]
pub enum PublishOutcome {
    /// The caller may not publish. Nothing changed.
    Rejected,
    /// A chat-only message was posted.
    Posted,
    /// A narration was started.
    Narrating(NarrationReceipt),
}

/// Tracks whether a published narration finished displaying.
///
/// Dropping the receipt stops listening.
#[derive(Debug)]
pub struct NarrationReceipt {
    id: u64,
    message: String,
    events: broadcast::Receiver<LifecycleEvent>,
}

impl NarrationReceipt {
    /// The epoch this narration was published as.
    #[must_use]
    pub fn narration_id(&self) -> u64 {
        self.id
    }

    /// The normalized text that was published.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Waits for the next narration close. Resolves to `true` if the closed
    /// narration carried this receipt's message, `false` if another one
    /// closed first or the controller stopped.
    pub async fn wait(mut self) -> bool {
        loop {
            match self.events.recv().await {
                Ok(LifecycleEvent::Closed(closed)) => return closed.message == self.message,
                Ok(LifecycleEvent::Opened(_)) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(narration_id = self.id, skipped, "receipt lagged behind lifecycle events");
                }
                Err(RecvError::Closed) => return false,
            }
        }
    }
}

/// Publishes narrations, descriptions and notifications, and drives the
/// narrator's pause and scenery controls.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn StateStore>,
    chat_log: Arc<dyn ChatLog>,
    controller: ControllerHandle,
    clock: Arc<dyn Clock>,
    settings: NarratorSettings,
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Publisher {
    /// Creates a publisher writing to `store` and `chat_log`, cancelling
    /// the local `controller`'s pending phases before each narration.
    #[must_use]
    pub fn new(
        store: Arc<dyn StateStore>,
        chat_log: Arc<dyn ChatLog>,
        controller: ControllerHandle,
        clock: Arc<dyn Clock>,
        settings: NarratorSettings,
    ) -> Self {
        Self {
            store,
            chat_log,
            controller,
            clock,
            settings,
        }
    }

    /// The settings new narrations are published with.
    #[must_use]
    pub fn settings(&self) -> &NarratorSettings {
        &self.settings
    }

    /// Publishes `text` as a message of `kind`.
    ///
    /// Every kind is posted to the chat log. A narration additionally
    /// replaces the shared narration record with a new epoch.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Persistence` if the chat log rejects the
    /// message, or `NarratorError::ChannelClosed` if the local controller
    /// has stopped.
    #[instrument(skip(self, text, options))]
    pub async fn publish(
        &self,
        role: Role,
        kind: MessageKind,
        text: &str,
        options: &PublishOptions,
    ) -> Result<PublishOutcome, NarratorError> {
        if !role.is_privileged() {
            warn!(?role, "rejected publish from non-narrator");
            return Ok(PublishOutcome::Rejected);
        }

        let message = normalize_text(text);
        self.post_chat(kind, &message, options).await?;

        if kind != MessageKind::Narration {
            info!("message posted");
            return Ok(PublishOutcome::Posted);
        }

        let receipt = self.start_narration(role, message).await?;
        Ok(PublishOutcome::Narrating(receipt))
    }

    /// Publishes a narration.
    ///
    /// # Errors
    ///
    /// See [`Publisher::publish`].
    pub async fn narrate(
        &self,
        role: Role,
        text: &str,
        options: &PublishOptions,
    ) -> Result<PublishOutcome, NarratorError> {
        self.publish(role, MessageKind::Narration, text, options)
            .await
    }

    /// Posts a scene description.
    ///
    /// # Errors
    ///
    /// See [`Publisher::publish`].
    pub async fn describe(
        &self,
        role: Role,
        text: &str,
        options: &PublishOptions,
    ) -> Result<PublishOutcome, NarratorError> {
        self.publish(role, MessageKind::Description, text, options)
            .await
    }

    /// Posts a notification.
    ///
    /// # Errors
    ///
    /// See [`Publisher::publish`].
    pub async fn notify(
        &self,
        role: Role,
        text: &str,
        options: &PublishOptions,
    ) -> Result<PublishOutcome, NarratorError> {
        self.publish(role, MessageKind::Notification, text, options)
            .await
    }

    /// Narrates `messages` one after another, each starting once the
    /// previous one has closed. Resolves to the last receipt's result, or
    /// `false` if nothing was narrated.
    ///
    /// # Errors
    ///
    /// See [`Publisher::publish`].
    #[instrument(skip(self, messages, options), fields(count = messages.len()))]
    pub async fn narrate_sequence(
        &self,
        role: Role,
        messages: &[String],
        options: &PublishOptions,
    ) -> Result<bool, NarratorError> {
        let mut finished = false;
        for message in messages {
            match self.narrate(role, message, options).await? {
                PublishOutcome::Narrating(receipt) => finished = receipt.wait().await,
                PublishOutcome::Rejected | PublishOutcome::Posted => return Ok(false),
            }
        }
        Ok(finished)
    }

    /// Freezes or resumes auto-scroll of the open narration. Returns the new
    /// pause flag, or `None` if the caller is not the narrator or nothing is
    /// open.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Unauthorized` only if the store disagrees
    /// about the caller's role.
    pub async fn set_paused(&self, role: Role, paused: bool) -> Result<Option<bool>, NarratorError> {
        self.change_pause(role, Some(paused)).await
    }

    /// Flips the pause flag of the open narration.
    ///
    /// # Errors
    ///
    /// See [`Publisher::set_paused`].
    pub async fn toggle_paused(&self, role: Role) -> Result<Option<bool>, NarratorError> {
        self.change_pause(role, None).await
    }

    /// Turns the scenery dimmer on or off, or flips it when `scenery` is
    /// `None`. Returns the new flag, or `None` if the caller is not the
    /// narrator.
    ///
    /// # Errors
    ///
    /// Returns `NarratorError::Unauthorized` only if the store disagrees
    /// about the caller's role.
    #[instrument(skip(self))]
    pub async fn set_scenery(
        &self,
        role: Role,
        scenery: Option<bool>,
    ) -> Result<Option<bool>, NarratorError> {
        if !role.is_privileged() {
            warn!(?role, "rejected scenery change from non-narrator");
            return Ok(None);
        }
        let mut changed = None;
        self.update(
            role,
            Box::new(|state: &SharedState| {
                let scenery = scenery.unwrap_or(!state.scenery);
                changed = Some(scenery);
                Ok(Some(StatePatch::scenery(scenery)))
            }),
        )
        .await?;
        info!(scenery = ?changed, "scenery changed");
        Ok(changed)
    }

    /// Reacts to the game being paused or resumed. When the settings link
    /// the two, the scenery dimmer follows the pause flag.
    ///
    /// # Errors
    ///
    /// See [`Publisher::set_scenery`].
    pub async fn game_paused(&self, role: Role, paused: bool) -> Result<Option<bool>, NarratorError> {
        if !self.settings.pause_links_scenery {
            return Ok(None);
        }
        self.set_scenery(role, Some(paused)).await
    }

    async fn post_chat(
        &self,
        kind: MessageKind,
        message: &str,
        options: &PublishOptions,
    ) -> Result<(), NarratorError> {
        let chat = ChatMessage {
            id: Uuid::new_v4(),
            kind,
            content: chat_content(kind.css_class(), message),
            speaker: options.speaker.clone(),
            scene: options.scene.clone(),
            created_at: self.clock.now(),
        };
        debug!(message_id = %chat.id, "posting chat message");
        self.chat_log.post(chat).await
    }

    /// Sets (`Some`) or flips (`None`) the pause flag, reading the open
    /// record under the store's write lock so a close cannot slip in between.
    #[instrument(skip(self))]
    async fn change_pause(
        &self,
        role: Role,
        paused: Option<bool>,
    ) -> Result<Option<bool>, NarratorError> {
        if !role.is_privileged() {
            warn!(?role, "rejected pause from non-narrator");
            return Ok(None);
        }
        let mut changed = None;
        self.update(
            role,
            Box::new(|state: &SharedState| {
                let narration = &state.narration;
                if !narration.is_open() {
                    return Ok(None);
                }
                let paused = paused.unwrap_or(!narration.paused);
                changed = Some((narration.id, paused));
                Ok(Some(StatePatch::narration(NarrationRecord {
                    paused,
                    ..narration.clone()
                })))
            }),
        )
        .await?;

        match changed {
            Some((id, paused)) => {
                info!(narration_id = id, paused, "narration pause changed");
                Ok(Some(paused))
            }
            None => {
                debug!("no open narration to pause");
                Ok(None)
            }
        }
    }

    async fn start_narration(
        &self,
        role: Role,
        message: String,
    ) -> Result<NarrationReceipt, NarratorError> {
        self.controller.cancel_pending().await?;
        let events = self.controller.subscribe_events();

        let start_paused = self.settings.start_paused;
        let mut published = None;
        self.update(
            role,
            Box::new(|state: &SharedState| -> Result<Option<StatePatch>, NarratorError> {
                let record =
                    NarrationRecord::next_epoch(&state.narration, message.clone(), start_paused)?;
                published = Some(record.id);
                Ok(Some(StatePatch::narration(record)))
            }),
        )
        .await?;
        let Some(id) = published else {
            return Err(NarratorError::Validation("narration was not written".into()));
        };
        info!(narration_id = id, "narration published");

        Ok(NarrationReceipt {
            id,
            message,
            events,
        })
    }

    /// Applies `change` through the store. A persistence failure is only
    /// logged: the change has already been replicated to every client.
    async fn update(&self, role: Role, change: StateUpdate<'_>) -> Result<(), NarratorError> {
        match self.store.update(role, change).await {
            Ok(_) => Ok(()),
            Err(NarratorError::Persistence(reason)) => {
                warn!(%reason, "shared state replicated but not persisted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use narrator_core::store::StatePersistence;
    use narrator_overlay::application::renderer::RecordingRenderer;
    use narrator_overlay::application::runtime::ControllerRuntime;
    use narrator_overlay::domain::controller::LifecycleController;
    use narrator_overlay::domain::events::NarrationClosed;
    use narrator_store::{MemoryPersistence, ReplicatedStateStore};
    use narrator_test_support::{
        FailingChatLog, FailingPersistence, FixedClock, RecordingChatLog, SlowPersistence,
    };
    use tokio::time::Instant;

    use super::*;

    struct Harness {
        publisher: Publisher,
        store: Arc<ReplicatedStateStore>,
        chat: Arc<RecordingChatLog>,
        controller: ControllerHandle,
    }

    fn harness_with(
        settings: NarratorSettings,
        persistence: Arc<dyn StatePersistence>,
        chat_log: Option<Arc<dyn ChatLog>>,
    ) -> Harness {
        let store = Arc::new(ReplicatedStateStore::with_state(
            SharedState::default(),
            persistence,
        ));
        let chat = Arc::new(RecordingChatLog::new());
        let controller = LifecycleController::new(
            Role::Narrator,
            settings.clone(),
            Box::new(|_: &str| 100.0),
        );
        let (handle, _task) = ControllerRuntime::spawn(
            controller,
            store.clone(),
            Box::new(RecordingRenderer::new()),
        );
        let chat_log: Arc<dyn ChatLog> = match chat_log {
            Some(log) => log,
            None => chat.clone(),
        };
        let publisher = Publisher::new(
            store.clone(),
            chat_log,
            handle.clone(),
            Arc::new(FixedClock::session_start()),
            settings,
        );
        Harness {
            publisher,
            store,
            chat,
            controller: handle,
        }
    }

    fn harness() -> Harness {
        harness_with(
            NarratorSettings::default(),
            Arc::new(MemoryPersistence::new()),
            None,
        )
    }

    fn receipt(outcome: PublishOutcome) -> NarrationReceipt {
        match outcome {
            PublishOutcome::Narrating(receipt) => receipt,
            other => panic!("expected a narration, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_narration_resolves_true_once_its_message_closes() {
        // Arrange
        let h = harness();
        let t0 = Instant::now();

        // Act
        let outcome = h
            .publisher
            .narrate(Role::Narrator, "Hello", &PublishOptions::default())
            .await
            .unwrap();
        let receipt = receipt(outcome);
        let id = receipt.narration_id();
        let finished = receipt.wait().await;

        // Assert
        assert_eq!(id, 1);
        assert!(finished);
        assert_eq!(t0.elapsed(), Duration::from_millis(6000));
        assert_eq!(h.store.get().narration.cleared(), h.store.get().narration);
        let posted = h.chat.posted();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].kind, MessageKind::Narration);
        assert_eq!(
            posted[0].content,
            r#"<span class="narrator-span narration">Hello</span>"#
        );
        assert_eq!(posted[0].speaker, "Narrator");
        assert_eq!(posted[0].created_at, FixedClock::session_start().now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_preempted_narration_resolves_false_and_never_closes() {
        // Arrange
        let h = harness();
        let mut events = h.controller.subscribe_events();
        let options = PublishOptions::default();
        let first = receipt(h.publisher.narrate(Role::Narrator, "A", &options).await.unwrap());
        tokio::time::sleep(Duration::from_secs(1)).await;

        // Act
        let second = receipt(h.publisher.narrate(Role::Narrator, "B", &options).await.unwrap());
        let first_finished = first.wait().await;
        let second_finished = second.wait().await;

        // Assert
        assert!(!first_finished);
        assert!(second_finished);
        let mut closed = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let LifecycleEvent::Closed(event) = event {
                closed.push(event);
            }
        }
        assert_eq!(
            closed,
            vec![NarrationClosed {
                id: 2,
                message: "B".to_owned()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_publish_is_rejected_without_side_effects() {
        // Arrange
        let h = harness();

        // Act
        let outcome = h
            .publisher
            .narrate(Role::Observer, "Sneaky", &PublishOptions::default())
            .await
            .unwrap();

        // Assert
        assert!(matches!(outcome, PublishOutcome::Rejected));
        assert_eq!(h.store.get(), SharedState::default());
        assert!(h.chat.posted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_description_is_chat_only() {
        // Arrange
        let h = harness();
        let options = PublishOptions::default().with_speaker("The Keeper");

        // Act
        let outcome = h
            .publisher
            .describe(Role::Narrator, "A dusty hall.", &options)
            .await
            .unwrap();

        // Assert
        assert!(matches!(outcome, PublishOutcome::Posted));
        assert_eq!(h.store.get(), SharedState::default());
        let posted = h.chat.posted();
        assert_eq!(posted[0].kind, MessageKind::Description);
        assert_eq!(posted[0].speaker, "The Keeper");
        assert_eq!(
            posted[0].content,
            r#"<span class="narrator-span description">A dusty hall.</span>"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_narration_text_is_normalized_and_start_paused_applies() {
        // Arrange
        let h = harness_with(
            NarratorSettings::default().with_start_paused(true),
            Arc::new(MemoryPersistence::new()),
            None,
        );

        // Act
        h.publisher
            .narrate(Role::Narrator, r"first\nsecond<br>third", &PublishOptions::default())
            .await
            .unwrap();

        // Assert
        let narration = h.store.get().narration;
        assert_eq!(narration.message, "first\nsecond\nthird");
        assert!(narration.paused);
        assert!(narration.display);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_keeps_epoch_and_is_noop_without_narration() {
        // Arrange
        let h = harness();
        let idle = h.publisher.set_paused(Role::Narrator, true).await.unwrap();
        h.publisher
            .narrate(Role::Narrator, "Hold on", &PublishOptions::default())
            .await
            .unwrap();

        // Act
        let paused = h.publisher.toggle_paused(Role::Narrator).await.unwrap();
        let observer = h.publisher.toggle_paused(Role::Observer).await.unwrap();

        // Assert
        assert_eq!(idle, None);
        assert_eq!(paused, Some(true));
        assert_eq!(observer, None);
        let narration = h.store.get().narration;
        assert_eq!(narration.id, 1);
        assert!(narration.paused);
        assert_eq!(narration.message, "Hold on");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenery_set_and_toggle() {
        // Arrange
        let h = harness();

        // Act
        let toggled_on = h.publisher.set_scenery(Role::Narrator, None).await.unwrap();
        let explicit = h.publisher.set_scenery(Role::Narrator, Some(true)).await.unwrap();
        let toggled_off = h.publisher.set_scenery(Role::Narrator, None).await.unwrap();
        let observer = h.publisher.set_scenery(Role::Observer, Some(true)).await.unwrap();

        // Assert
        assert_eq!(toggled_on, Some(true));
        assert_eq!(explicit, Some(true));
        assert_eq!(toggled_off, Some(false));
        assert_eq!(observer, None);
        assert!(!h.store.get().scenery);
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_pause_drives_scenery_only_when_linked() {
        // Arrange
        let unlinked = harness();
        let linked = harness_with(
            NarratorSettings::default().with_pause_links_scenery(true),
            Arc::new(MemoryPersistence::new()),
            None,
        );

        // Act
        let ignored = unlinked.publisher.game_paused(Role::Narrator, true).await.unwrap();
        let mirrored = linked.publisher.game_paused(Role::Narrator, true).await.unwrap();

        // Assert
        assert_eq!(ignored, None);
        assert!(!unlinked.store.get().scenery);
        assert_eq!(mirrored, Some(true));
        assert!(linked.store.get().scenery);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_narrates_each_message_after_the_previous_closes() {
        // Arrange
        let h = harness();
        let mut events = h.controller.subscribe_events();
        let messages = vec!["One".to_owned(), "Two".to_owned()];

        // Act
        let finished = h
            .publisher
            .narrate_sequence(Role::Narrator, &messages, &PublishOptions::default())
            .await
            .unwrap();

        // Assert
        assert!(finished);
        let mut order = Vec::new();
        while let Ok(event) = events.try_recv() {
            order.push((event.event_type(), event.narration_id()));
        }
        assert_eq!(
            order,
            vec![
                ("narration.opened", 1),
                ("narration.closed", 1),
                ("narration.opened", 2),
                ("narration.closed", 2),
            ]
        );
        assert_eq!(h.chat.posted().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_log_failure_surfaces_and_leaves_state() {
        // Arrange
        let h = harness_with(
            NarratorSettings::default(),
            Arc::new(MemoryPersistence::new()),
            Some(Arc::new(FailingChatLog)),
        );

        // Act
        let result = h
            .publisher
            .narrate(Role::Narrator, "Lost", &PublishOptions::default())
            .await;

        // Assert
        assert!(matches!(result, Err(NarratorError::Persistence(_))));
        assert_eq!(h.store.get(), SharedState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_narration_survives_persistence_failure() {
        // Arrange
        let h = harness_with(
            NarratorSettings::default(),
            Arc::new(FailingPersistence),
            None,
        );

        // Act
        let outcome = h
            .publisher
            .narrate(Role::Narrator, "Still shown", &PublishOptions::default())
            .await
            .unwrap();

        // Assert
        assert!(receipt(outcome).wait().await);
    }

    fn slow_harness() -> Harness {
        harness_with(
            NarratorSettings::default(),
            Arc::new(SlowPersistence::new(Duration::from_millis(50))),
            None,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_narrations_get_distinct_increasing_ids() {
        // Arrange
        let h = slow_harness();
        let options = PublishOptions::default();

        // Act
        let (a, b, scenery) = tokio::join!(
            h.publisher.narrate(Role::Narrator, "A", &options),
            h.publisher.narrate(Role::Narrator, "B", &options),
            h.publisher.set_scenery(Role::Narrator, Some(true)),
        );

        // Assert
        let a = receipt(a.unwrap());
        let b = receipt(b.unwrap());
        let mut ids = [a.narration_id(), b.narration_id()];
        ids.sort_unstable();
        assert_eq!(ids, [1, 2]);
        let latest = if a.narration_id() == 2 { &a } else { &b };
        let state = h.store.get();
        assert_eq!(state.narration.id, 2);
        assert_eq!(state.narration.message, latest.message());
        assert_eq!(scenery.unwrap(), Some(true));
        assert!(state.scenery, "scenery must survive both narration writes");
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_queued_behind_a_close_does_not_reopen_the_narration() {
        // Arrange
        let h = slow_harness();
        h.publisher
            .narrate(Role::Narrator, "Hello", &PublishOptions::default())
            .await
            .unwrap();
        let cleared = h.store.get().narration.cleared();

        // Act
        let (closed, paused) = tokio::join!(
            h.store.set(Role::Narrator, StatePatch::narration(cleared.clone())),
            h.publisher.set_paused(Role::Narrator, true),
        );

        // Assert
        closed.unwrap();
        assert_eq!(paused.unwrap(), None);
        let narration = h.store.get().narration;
        assert_eq!(narration, cleared);
        assert!(!narration.is_open());
    }
}
