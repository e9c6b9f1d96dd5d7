//! Monotonic millisecond time over a wrapping counter.

/// Timestamp from a free-running millisecond counter.
///
/// The raw counter wraps around every ~49.7 days, so ticks carry no total
/// order. All comparisons go through [`Tick::millis_since`], which stays
/// correct across the wrap as long as the two ticks are less than half the
/// counter range apart.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tick(u32);

impl Tick {
    pub const fn from_millis(raw: u32) -> Self {
        Self(raw)
    }

    /// Tick `millis` later on the wrapping counter.
    pub const fn add_millis(self, millis: u32) -> Self {
        Self(self.0.wrapping_add(millis))
    }

    /// Signed distance from `earlier` to `self` in milliseconds.
    ///
    /// Negative when `self` is before `earlier`.
    pub const fn millis_since(self, earlier: Tick) -> i32 {
        self.0.wrapping_sub(earlier.0) as i32
    }
}

/// Source of the current tick.
pub trait Clock {
    fn now(&self) -> Tick;
}

impl<T: Clock> Clock for &T {
    fn now(&self) -> Tick {
        (*self).now()
    }
}

/// Hand-driven clock used during bring-up and in host tests.
#[derive(Default, Debug)]
pub struct ManualClock {
    now: core::cell::Cell<u32>,
}

impl ManualClock {
    pub const fn new() -> Self {
        Self {
            now: core::cell::Cell::new(0),
        }
    }

    pub fn set(&self, tick: Tick) {
        self.now.set(tick.0);
    }

    pub fn advance_millis(&self, millis: u32) {
        self.now.set(self.now.get().wrapping_add(millis));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Tick {
        Tick::from_millis(self.now.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_since_counts_forward() {
        let start = Tick::from_millis(1_000);
        assert_eq!(start.add_millis(250).millis_since(start), 250);
        assert_eq!(start.millis_since(start), 0);
    }

    #[test]
    fn millis_since_is_negative_before() {
        let start = Tick::from_millis(5_000);
        assert_eq!(start.millis_since(start.add_millis(300)), -300);
    }

    #[test]
    fn arithmetic_survives_counter_wrap() {
        let near_wrap = Tick::from_millis(u32::MAX - 100);
        let after = near_wrap.add_millis(250);
        assert_eq!(after.millis_since(near_wrap), 250);
        assert_eq!(near_wrap.millis_since(after), -250);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new();
        let before = clock.now();
        clock.advance_millis(42);
        assert_eq!(clock.now().millis_since(before), 42);
    }
}
