//! Milliseconds since boot as the core tick source.

use eggtimer_core::clock::{Clock, Tick};
use esp_hal::time::Instant;

/// Tick source over the free-running system timer. The core only does
/// modular arithmetic, so truncating the 64-bit uptime to 32 bits is fine.
#[derive(Default, Debug, Clone, Copy)]
pub struct BoardClock;

impl BoardClock {
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for BoardClock {
    fn now(&self) -> Tick {
        Tick::from_millis(Instant::now().duration_since_epoch().as_millis() as u32)
    }
}
