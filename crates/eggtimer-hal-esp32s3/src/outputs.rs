//! Board output pins behind the core's infallible bank.

use embedded_hal::digital::StatefulOutputPin;

use eggtimer_core::outputs::OutputBank;

/// Heartbeat and indicator pins. On-package push-pull GPIO cannot fail, so
/// pin errors are discarded and readback falls back to off.
pub struct BoardOutputs<L, I> {
    liveness: L,
    indicator: I,
}

impl<L, I> BoardOutputs<L, I>
where
    L: StatefulOutputPin,
    I: StatefulOutputPin,
{
    /// Takes ownership of both pins. The application drives them to their
    /// starting levels through the bank.
    pub fn new(liveness: L, indicator: I) -> Self {
        Self {
            liveness,
            indicator,
        }
    }
}

impl<L, I> OutputBank for BoardOutputs<L, I>
where
    L: StatefulOutputPin,
    I: StatefulOutputPin,
{
    fn set_liveness(&mut self, on: bool) {
        let _ = if on {
            self.liveness.set_high()
        } else {
            self.liveness.set_low()
        };
    }

    fn toggle_liveness(&mut self) {
        let _ = self.liveness.toggle();
    }

    fn set_indicator(&mut self, on: bool) {
        let _ = if on {
            self.indicator.set_high()
        } else {
            self.indicator.set_low()
        };
    }

    fn indicator_on(&mut self) -> bool {
        self.indicator.is_set_high().unwrap_or(false)
    }
}
