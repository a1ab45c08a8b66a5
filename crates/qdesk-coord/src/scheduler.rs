//! Poll scheduler state machine.
//!
//! `Disabled → Waiting(countdown) → Fetching → Waiting` on success,
//! `Fetching → Waiting` on failure too (the cadence never stops for
//! errors), `→ Disabled` on explicit disable from any state. Initial state
//! is `Disabled` until a valid scope is known.
//!
//! Rescheduling is drift-free relative to *completion*: after a fetch
//! finishes, the next fire is `now + interval`, not the original schedule
//! plus the interval. Visibility is re-checked on every due-ness probe
//! rather than via a separate event subscription, keeping the component
//! dependency-light.

use std::sync::Arc;

use tracing::debug;

use qdesk_core::Clock;

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Disabled,
    Waiting,
    Fetching,
}

/// Drives periodic queue-state fetches on a fixed interval, gated by
/// enablement and document visibility, exposing a countdown for the UI.
pub struct PollScheduler {
    clock: Arc<dyn Clock>,
    interval_ms: i64,
    state: SchedulerState,
    next_fire_at: i64,
}

impl PollScheduler {
    pub fn new(clock: Arc<dyn Clock>, interval_ms: i64) -> Self {
        Self {
            clock,
            interval_ms,
            state: SchedulerState::Disabled,
            next_fire_at: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state != SchedulerState::Disabled
    }

    /// Enable polling. The schedule resets to a full interval from now —
    /// no stale countdown is carried over from a prior disabled period.
    pub fn enable(&mut self) {
        if self.state != SchedulerState::Disabled {
            return;
        }
        self.state = SchedulerState::Waiting;
        self.next_fire_at = self.clock.now_ms() + self.interval_ms;
        debug!(next_fire_at = self.next_fire_at, "scheduler enabled");
    }

    /// Disable polling from any state. No further fires occur until
    /// re-enabled.
    pub fn disable(&mut self) {
        self.state = SchedulerState::Disabled;
        debug!("scheduler disabled");
    }

    /// Whether a fetch should fire now. Only true when enabled, the
    /// document is visible, and the countdown has elapsed.
    pub fn due(&self, visible: bool) -> bool {
        self.state == SchedulerState::Waiting
            && visible
            && self.clock.now_ms() >= self.next_fire_at
    }

    /// Transition `Waiting → Fetching`. Callers probe [`Self::due`] first.
    pub fn begin_fetch(&mut self) {
        if self.state == SchedulerState::Waiting {
            self.state = SchedulerState::Fetching;
        }
    }

    /// Transition `Fetching → Waiting` and reschedule a full interval from
    /// now. Called on success and failure alike.
    pub fn complete_fetch(&mut self) {
        if self.state == SchedulerState::Fetching {
            self.state = SchedulerState::Waiting;
            self.next_fire_at = self.clock.now_ms() + self.interval_ms;
        }
    }

    /// Manual "fetch now": pull the countdown forward without otherwise
    /// altering scheduler state. The caller performs the fetch itself.
    pub fn reschedule_from_now(&mut self) {
        if self.state != SchedulerState::Disabled {
            self.next_fire_at = self.clock.now_ms() + self.interval_ms;
        }
    }

    /// Remaining milliseconds until the next fire, for a UI countdown.
    /// `None` while disabled; zero while a fetch is in flight or overdue.
    pub fn remaining_ms(&self) -> Option<i64> {
        match self.state {
            SchedulerState::Disabled => None,
            SchedulerState::Fetching => Some(0),
            SchedulerState::Waiting => Some((self.next_fire_at - self.clock.now_ms()).max(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdesk_core::ManualClock;

    fn scheduler(clock: Arc<ManualClock>) -> PollScheduler {
        PollScheduler::new(clock, 10_000)
    }

    #[test]
    fn starts_disabled() {
        let clock = ManualClock::at(0);
        let s = scheduler(clock);
        assert_eq!(s.state(), SchedulerState::Disabled);
        assert!(!s.due(true));
        assert_eq!(s.remaining_ms(), None);
    }

    #[test]
    fn enable_resets_to_full_interval() {
        let clock = ManualClock::at(5_000);
        let mut s = scheduler(clock.clone());
        s.enable();
        assert_eq!(s.remaining_ms(), Some(10_000));
        assert!(!s.due(true));
        clock.advance(10_000);
        assert!(s.due(true));
    }

    #[test]
    fn hidden_document_defers_fire() {
        let clock = ManualClock::at(0);
        let mut s = scheduler(clock.clone());
        s.enable();
        clock.advance(10_000);
        assert!(!s.due(false));
        assert!(s.due(true));
    }

    #[test]
    fn reschedule_is_relative_to_completion() {
        let clock = ManualClock::at(0);
        let mut s = scheduler(clock.clone());
        s.enable();
        clock.set(10_000);
        assert!(s.due(true));
        s.begin_fetch();
        assert_eq!(s.state(), SchedulerState::Fetching);
        assert_eq!(s.remaining_ms(), Some(0));

        // Fetch takes 2s; next fire counts from completion, not schedule.
        clock.set(12_000);
        s.complete_fetch();
        assert_eq!(s.state(), SchedulerState::Waiting);
        assert_eq!(s.remaining_ms(), Some(10_000));
        clock.set(22_000);
        assert!(s.due(true));
    }

    #[test]
    fn manual_refresh_pushes_countdown_forward() {
        let clock = ManualClock::at(0);
        let mut s = scheduler(clock.clone());
        s.enable();
        clock.set(7_000);
        assert_eq!(s.remaining_ms(), Some(3_000));
        s.reschedule_from_now();
        assert_eq!(s.remaining_ms(), Some(10_000));
        assert_eq!(s.state(), SchedulerState::Waiting);
    }

    #[test]
    fn disable_stops_fires_from_any_state() {
        let clock = ManualClock::at(0);
        let mut s = scheduler(clock.clone());
        s.enable();
        clock.set(10_000);
        s.begin_fetch();
        s.disable();
        assert_eq!(s.state(), SchedulerState::Disabled);
        clock.set(60_000);
        assert!(!s.due(true));

        // Re-enable starts a fresh countdown.
        s.enable();
        assert_eq!(s.remaining_ms(), Some(10_000));
    }

    #[test]
    fn countdown_saturates_at_zero_when_overdue() {
        let clock = ManualClock::at(0);
        let mut s = scheduler(clock.clone());
        s.enable();
        clock.set(25_000);
        assert_eq!(s.remaining_ms(), Some(0));
    }
}
