//! Periodic-duty gates and access-point supervision decisions.
//!
//! Radio actuation lives in the firmware binary; this module only decides
//! when a duty is due, so the scheduling rules stay host-testable.

use crate::clock::Tick;

/// Fires once per elapsed period on the wrapping clock.
///
/// The window re-arms from the moment it fires, not from the nominal
/// schedule, matching how the appliance has always drifted.
#[derive(Clone, Copy, Debug)]
pub struct IntervalGate {
    last: Tick,
    period_ms: u32,
}

impl IntervalGate {
    pub const fn new(start: Tick, period_ms: u32) -> Self {
        Self {
            last: start,
            period_ms,
        }
    }

    pub fn due(&mut self, now: Tick) -> bool {
        if now.millis_since(self.last) >= self.period_ms as i32 {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// What the event loop should do about the access point right now.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ApDirective {
    None,
    Restart,
}

/// Decides when the access point gets re-checked and when its status line
/// is worth logging.
#[derive(Clone, Copy, Debug)]
pub struct ApSupervisor {
    ensure: IntervalGate,
    log: IntervalGate,
}

impl ApSupervisor {
    pub const fn new(start: Tick, ensure_every_ms: u32, log_every_ms: u32) -> Self {
        Self {
            ensure: IntervalGate::new(start, ensure_every_ms),
            log: IntervalGate::new(start, log_every_ms),
        }
    }

    /// Checked once per loop iteration. A `Restart` is only issued when the
    /// ensure window has elapsed and the radio reports inactive.
    pub fn poll(&mut self, now: Tick, active: bool) -> ApDirective {
        if self.ensure.due(now) && !active {
            ApDirective::Restart
        } else {
            ApDirective::None
        }
    }

    pub fn log_due(&mut self, now: Tick) -> bool {
        self.log.due(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: Tick = Tick::from_millis(1_000);

    #[test]
    fn gate_waits_out_its_period() {
        let mut gate = IntervalGate::new(T0, 1_000);
        assert!(!gate.due(T0));
        assert!(!gate.due(T0.add_millis(999)));
        assert!(gate.due(T0.add_millis(1_000)));
    }

    #[test]
    fn gate_rearms_after_firing() {
        let mut gate = IntervalGate::new(T0, 1_000);
        assert!(gate.due(T0.add_millis(1_500)));
        assert!(!gate.due(T0.add_millis(1_600)));
        assert!(gate.due(T0.add_millis(2_500)));
    }

    #[test]
    fn restart_needs_elapsed_window_and_inactive_radio() {
        let mut sup = ApSupervisor::new(T0, 5_000, 5_000);
        assert_eq!(sup.poll(T0.add_millis(100), false), ApDirective::None);
        assert_eq!(sup.poll(T0.add_millis(5_000), false), ApDirective::Restart);
    }

    #[test]
    fn active_radio_is_left_alone() {
        let mut sup = ApSupervisor::new(T0, 5_000, 5_000);
        assert_eq!(sup.poll(T0.add_millis(5_000), true), ApDirective::None);
        // Window re-armed above; a failure right after still waits it out.
        assert_eq!(sup.poll(T0.add_millis(5_100), false), ApDirective::None);
        assert_eq!(sup.poll(T0.add_millis(10_000), false), ApDirective::Restart);
    }

    #[test]
    fn log_window_is_independent() {
        let mut sup = ApSupervisor::new(T0, 5_000, 2_000);
        assert!(!sup.log_due(T0.add_millis(1_999)));
        assert!(sup.log_due(T0.add_millis(2_000)));
        assert_eq!(sup.poll(T0.add_millis(2_000), false), ApDirective::None);
    }
}
