//! The narration lifecycle state machine.
//!
//! A `LifecycleController` owns one client's view of the overlay. It is
//! driven by two inputs only: `reconcile` with every replicated state the
//! store delivers, and `fire_due` when a phase deadline elapses. Both return
//! the outputs the caller must apply; the controller itself performs no I/O.
//!
//! Cancellation is centralized in [`PhaseTimers`]: a new epoch cancels every
//! phase, `display == false` cancels every phase, and a pause cancels only the
//! scroll phase. The close deadline keeps running while paused.

use narrator_core::duration::{
    BACKGROUND_PARALLAX, REVEAL_DELAY, VISIBLE_CONTENT_CAP, message_duration, scroll_budget,
    scroll_settle_delay,
};
use narrator_core::role::Role;
use narrator_core::settings::NarratorSettings;
use narrator_core::state::{NarrationRecord, SharedState};
use tokio::time::Instant;
use tracing::{debug, info};

use super::events::{LifecycleEvent, NarrationOpened};
use super::render::{ContentMeasure, RenderCommand};
use super::timers::{PhaseTimers, TimerPhase};
use super::view::OverlayView;

/// Something the caller of the controller must carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerOutput {
    /// Paint this on the overlay.
    Render(RenderCommand),
    /// Publish this to local lifecycle listeners.
    Event(LifecycleEvent),
    /// The display duration of epoch `id` has elapsed: clear the record and
    /// announce the close. Only produced on the narrator's client.
    CloseDue {
        /// The epoch to close.
        id: u64,
        /// The text that was on display.
        message: String,
    },
}

/// Conceptual lifecycle phase, derived from the latest record and the local
/// timers. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    /// Nothing to display.
    Idle,
    /// A new epoch is waiting out its reveal pre-roll.
    Revealing,
    /// Content is shown and not moving.
    Open,
    /// Content is moving toward its tail.
    Scrolling,
    /// Content is shown or about to be, with auto-scroll frozen.
    Paused,
    /// The last seen epoch has been cleared by the narrator.
    Closing,
}

/// One client's narration lifecycle state machine.
pub struct LifecycleController {
    role: Role,
    settings: NarratorSettings,
    measure: Box<dyn ContentMeasure>,
    last_id: u64,
    last_paused: bool,
    record: NarrationRecord,
    timers: PhaseTimers,
    view: OverlayView,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("role", &self.role)
            .field("last_id", &self.last_id)
            .field("record", &self.record)
            .field("timers", &self.timers)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl LifecycleController {
    /// Creates a controller for a client playing `role`.
    #[must_use]
    pub fn new(role: Role, settings: NarratorSettings, measure: Box<dyn ContentMeasure>) -> Self {
        Self {
            role,
            settings,
            measure,
            last_id: 0,
            last_paused: false,
            record: NarrationRecord::default(),
            timers: PhaseTimers::default(),
            view: OverlayView::default(),
        }
    }

    /// The role of the client this controller runs on.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// The last epoch this controller started.
    #[must_use]
    pub fn last_id(&self) -> u64 {
        self.last_id
    }

    /// The locally painted overlay.
    #[must_use]
    pub fn view(&self) -> &OverlayView {
        &self.view
    }

    /// The outstanding phase deadlines.
    #[must_use]
    pub fn timers(&self) -> &PhaseTimers {
        &self.timers
    }

    /// The earliest outstanding phase deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Cancels every outstanding phase without touching the view.
    pub fn cancel_pending(&mut self) {
        if !self.timers.is_idle() {
            debug!(narration_id = self.last_id, "pending narration timers cancelled");
        }
        self.timers.cancel_all();
    }

    /// Derives the conceptual phase at `now`.
    #[must_use]
    pub fn phase(&self, now: Instant) -> OverlayPhase {
        let revealing = self.timers.is_pending(TimerPhase::Reveal);
        if !self.record.display {
            let cleared_epoch = self.last_id != 0
                && self.record.id == self.last_id
                && self.record.message.is_empty();
            return if cleared_epoch {
                OverlayPhase::Closing
            } else {
                OverlayPhase::Idle
            };
        }
        if self.record.paused && (revealing || self.view.content_visible) {
            OverlayPhase::Paused
        } else if revealing {
            OverlayPhase::Revealing
        } else if self.view.is_scrolling(now) {
            OverlayPhase::Scrolling
        } else if self.view.content_visible {
            OverlayPhase::Open
        } else {
            OverlayPhase::Idle
        }
    }

    /// Brings the local overlay in line with the authoritative `state`.
    pub fn reconcile(&mut self, state: &SharedState, now: Instant) -> Vec<ControllerOutput> {
        let mut outputs = Vec::new();
        let narration = &state.narration;
        self.record = narration.clone();

        if self.view.scenery != Some(state.scenery) {
            self.view.scenery = Some(state.scenery);
            outputs.push(ControllerOutput::Render(RenderCommand::SetScenery {
                visible: state.scenery,
            }));
        }

        if !narration.display {
            self.cancel_pending();
            if self.view.content_visible {
                outputs.push(ControllerOutput::Render(RenderCommand::CollapseBackground));
                self.hide_content(&mut outputs);
            }
        }

        if narration.message.is_empty() && self.view.content_visible {
            self.hide_content(&mut outputs);
        }

        if narration.display && narration.id != self.last_id {
            self.start_epoch(narration.id, now, &mut outputs);
        }

        self.apply_pause(narration.paused, now, &mut outputs);
        self.last_paused = narration.paused;

        outputs
    }

    /// Fires every phase due at `now`, in deadline order. Follow-up phases
    /// are scheduled relative to the deadline that fired, not to `now`.
    pub fn fire_due(&mut self, now: Instant) -> Vec<ControllerOutput> {
        let mut outputs = Vec::new();
        while let Some((phase, at)) = self.timers.take_due(now) {
            match phase {
                TimerPhase::Reveal => self.reveal(at, &mut outputs),
                TimerPhase::Scroll => self.scroll(at, &mut outputs),
                TimerPhase::Close => self.close(&mut outputs),
            }
        }
        outputs
    }

    fn multiplier(&self) -> f64 {
        self.settings.duration_multiplier
    }

    /// Length in Unicode scalar values, so an emoji counts once.
    fn message_length(&self) -> usize {
        self.view.message.chars().count()
    }

    fn start_epoch(&mut self, id: u64, now: Instant, outputs: &mut Vec<ControllerOutput>) {
        self.timers.cancel_all();
        self.last_id = id;
        if self.view.content_visible {
            self.hide_content(outputs);
        }
        self.view.hide();
        self.timers.schedule(TimerPhase::Reveal, now + REVEAL_DELAY);
        info!(narration_id = id, role = ?self.role, "narration epoch started");
    }

    fn hide_content(&mut self, outputs: &mut Vec<ControllerOutput>) {
        self.view.hide();
        outputs.push(ControllerOutput::Render(RenderCommand::HideContent));
    }

    fn apply_pause(&mut self, paused: bool, now: Instant, outputs: &mut Vec<ControllerOutput>) {
        if paused {
            if self.timers.cancel(TimerPhase::Scroll) {
                debug!(narration_id = self.last_id, "scroll timer cancelled by pause");
            }
            if let Some(at) = self.view.freeze(now) {
                outputs.push(ControllerOutput::Render(RenderCommand::StopScroll { at }));
            }
        } else if self.last_paused && self.view.content_visible {
            debug!(narration_id = self.last_id, "narration resumed");
            self.animate_remaining(now, outputs);
        }
    }

    fn reveal(&mut self, at: Instant, outputs: &mut Vec<ControllerOutput>) {
        if !self.record.is_open() {
            return;
        }
        let message = self.record.message.clone();
        let height = self.measure.content_height(&message);
        self.view.show(message.clone(), height);

        outputs.push(ControllerOutput::Render(RenderCommand::ShowContent {
            message: message.clone(),
        }));
        outputs.push(ControllerOutput::Render(RenderCommand::SetBackgroundHeight {
            height: height.min(VISIBLE_CONTENT_CAP) * BACKGROUND_PARALLAX,
        }));
        outputs.push(ControllerOutput::Event(LifecycleEvent::Opened(NarrationOpened {
            id: self.last_id,
            message,
        })));
        info!(narration_id = self.last_id, height, "narration revealed");

        if !self.record.paused && self.view.overflow() > 0.0 {
            self.timers
                .schedule(TimerPhase::Scroll, at + scroll_settle_delay(self.multiplier()));
        }
        if self.role.is_privileged() {
            let duration = message_duration(self.message_length(), self.multiplier());
            self.timers.schedule(TimerPhase::Close, at + duration);
            debug!(narration_id = self.last_id, ?duration, "close scheduled");
        }
    }

    fn scroll(&mut self, at: Instant, outputs: &mut Vec<ControllerOutput>) {
        if self.record.paused || !self.view.content_visible {
            return;
        }
        self.animate_remaining(at, outputs);
    }

    fn animate_remaining(&mut self, now: Instant, outputs: &mut Vec<ControllerOutput>) {
        let remaining = self.view.remaining_fraction(now);
        if remaining <= 0.0 {
            return;
        }
        let budget = scroll_budget(self.message_length(), self.multiplier());
        let motion = self.view.start_scroll(now, budget.mul_f64(remaining));
        debug!(
            narration_id = self.last_id,
            from = motion.from,
            to = motion.to,
            duration = ?motion.duration,
            "scrolling narration"
        );
        outputs.push(ControllerOutput::Render(RenderCommand::AnimateScroll {
            from: motion.from,
            to: motion.to,
            duration: motion.duration,
        }));
    }

    fn close(&mut self, outputs: &mut Vec<ControllerOutput>) {
        outputs.push(ControllerOutput::CloseDue {
            id: self.last_id,
            message: self.view.message.clone(),
        });
    }
}
