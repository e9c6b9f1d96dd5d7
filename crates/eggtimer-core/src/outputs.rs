//! Output pins as seen by the application.

/// The two output pins of the appliance.
///
/// `liveness` is the heartbeat pin toggled while the event loop breathes;
/// `indicator` latches on when a countdown expires. The surface is
/// infallible: board layers absorb pin faults.
pub trait OutputBank {
    fn set_liveness(&mut self, on: bool);
    fn toggle_liveness(&mut self);
    fn set_indicator(&mut self, on: bool);
    /// `&mut` because embedded-hal pin readback is `&mut`.
    fn indicator_on(&mut self) -> bool;
}

/// Recording bank for host tests.
#[derive(Default, Debug, Clone, Copy)]
pub struct MockOutputs {
    pub liveness: bool,
    pub liveness_toggles: u32,
    pub indicator: bool,
}

impl MockOutputs {
    pub const fn new() -> Self {
        Self {
            liveness: false,
            liveness_toggles: 0,
            indicator: false,
        }
    }
}

impl OutputBank for MockOutputs {
    fn set_liveness(&mut self, on: bool) {
        self.liveness = on;
    }

    fn toggle_liveness(&mut self) {
        self.liveness = !self.liveness;
        self.liveness_toggles = self.liveness_toggles.saturating_add(1);
    }

    fn set_indicator(&mut self, on: bool) {
        self.indicator = on;
    }

    fn indicator_on(&mut self) -> bool {
        self.indicator
    }
}
