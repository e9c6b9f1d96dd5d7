//! Countdown state machine.

use crate::clock::Tick;

/// Longest countdown the appliance accepts, in seconds.
pub const MAX_TIMER_SECONDS: u32 = 3600;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerPhase {
    Idle,
    Running,
    /// Last run ended by reaching its deadline (not by a stop request).
    Expired,
}

/// One-shot countdown against the wrapping millisecond clock.
///
/// The machine never touches pins. Callers apply the indicator effects:
/// clear it on [`CountdownTimer::start`], raise it when
/// [`CountdownTimer::tick`] reports expiry.
#[derive(Clone, Copy, Debug)]
pub struct CountdownTimer {
    deadline: Tick,
    phase: TimerPhase,
}

impl CountdownTimer {
    pub const fn new() -> Self {
        Self {
            deadline: Tick::from_millis(0),
            phase: TimerPhase::Idle,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, TimerPhase::Running)
    }

    /// Arms the countdown. `seconds` is clamped to `1..=MAX_TIMER_SECONDS`;
    /// the clamped value is returned.
    pub fn start(&mut self, now: Tick, seconds: u32) -> u32 {
        let seconds = seconds.clamp(1, MAX_TIMER_SECONDS);
        self.deadline = now.add_millis(seconds * 1000);
        self.phase = TimerPhase::Running;
        seconds
    }

    /// Cancels a running countdown. Does nothing once expired or idle.
    pub fn stop(&mut self) {
        if matches!(self.phase, TimerPhase::Running) {
            self.phase = TimerPhase::Idle;
        }
    }

    /// Advances the machine. Returns true exactly once, on the call that
    /// observes the deadline.
    pub fn tick(&mut self, now: Tick) -> bool {
        if matches!(self.phase, TimerPhase::Running) && self.deadline.millis_since(now) <= 0 {
            self.phase = TimerPhase::Expired;
            return true;
        }
        false
    }

    /// Whole seconds left, rounded up, zero unless running.
    ///
    /// Immediately after `start(now, s)` this reports exactly `s`, and it
    /// never increases while the countdown runs.
    pub fn remaining_seconds(&self, now: Tick) -> u32 {
        if !self.is_running() {
            return 0;
        }
        let left = self.deadline.millis_since(now);
        if left <= 0 {
            0
        } else {
            (left as u32 + 999) / 1000
        }
    }
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new()
    }
}
