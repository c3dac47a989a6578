//! Per-client phase deadlines.

use tokio::time::Instant;

/// The timed phases of a narration epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPhase {
    /// Pre-roll before the content fades in.
    Reveal,
    /// Settle delay before overflowing content starts scrolling.
    Scroll,
    /// End of the display duration; the narrator's client clears the record.
    Close,
}

impl TimerPhase {
    /// Every phase, in the order ties are fired.
    pub const ALL: [Self; 3] = [Self::Reveal, Self::Scroll, Self::Close];
}

/// At most one outstanding deadline per [`TimerPhase`].
///
/// Scheduling a phase replaces its previous deadline, so an orphaned
/// callback from a superseded epoch can never fire.
#[derive(Debug, Clone, Default)]
pub struct PhaseTimers {
    reveal: Option<Instant>,
    scroll: Option<Instant>,
    close: Option<Instant>,
}

impl PhaseTimers {
    fn slot(&self, phase: TimerPhase) -> Option<Instant> {
        match phase {
            TimerPhase::Reveal => self.reveal,
            TimerPhase::Scroll => self.scroll,
            TimerPhase::Close => self.close,
        }
    }

    fn slot_mut(&mut self, phase: TimerPhase) -> &mut Option<Instant> {
        match phase {
            TimerPhase::Reveal => &mut self.reveal,
            TimerPhase::Scroll => &mut self.scroll,
            TimerPhase::Close => &mut self.close,
        }
    }

    /// Schedules `phase` at `at`. Returns `true` if a pending deadline of the
    /// same phase was replaced.
    pub fn schedule(&mut self, phase: TimerPhase, at: Instant) -> bool {
        self.slot_mut(phase).replace(at).is_some()
    }

    /// Cancels `phase`. Returns `true` if it was pending.
    pub fn cancel(&mut self, phase: TimerPhase) -> bool {
        self.slot_mut(phase).take().is_some()
    }

    /// Cancels every phase.
    pub fn cancel_all(&mut self) {
        for phase in TimerPhase::ALL {
            self.cancel(phase);
        }
    }

    /// The deadline of `phase`, if pending.
    #[must_use]
    pub fn deadline(&self, phase: TimerPhase) -> Option<Instant> {
        self.slot(phase)
    }

    /// Returns `true` if `phase` is pending.
    #[must_use]
    pub fn is_pending(&self, phase: TimerPhase) -> bool {
        self.slot(phase).is_some()
    }

    /// Returns `true` if no phase is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        TimerPhase::ALL.iter().all(|phase| !self.is_pending(*phase))
    }

    /// The earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        TimerPhase::ALL
            .iter()
            .filter_map(|phase| self.slot(*phase))
            .min()
    }

    /// Removes and returns the earliest phase due at `now`, together with
    /// its deadline.
    pub fn take_due(&mut self, now: Instant) -> Option<(TimerPhase, Instant)> {
        let (phase, at) = TimerPhase::ALL
            .iter()
            .filter_map(|phase| self.slot(*phase).map(|at| (*phase, at)))
            .filter(|(_, at)| *at <= now)
            .min_by_key(|(_, at)| *at)?;
        self.cancel(phase);
        Some((phase, at))
    }
}
