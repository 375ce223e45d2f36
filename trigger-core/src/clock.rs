//! Millisecond clock abstraction consumed by the pulse scheduler.
//!
//! Every target exposes a free-running `u32` millisecond counter that wraps
//! after roughly 49.7 days. The scheduler never orders two readings directly;
//! it only ever looks at the modular difference computed by [`elapsed_ms`].

/// Monotonic millisecond counter that wraps at 2^32.
pub trait ClockSource {
    /// Returns the current counter value.
    fn now_ms(&self) -> u32;
}

impl<T: ClockSource + ?Sized> ClockSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds elapsed from `since` to `now`, correct across counter wraparound.
#[must_use]
pub const fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Clock that only moves when told to. Used by tests and scripted transcripts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ManualClock {
    now: u32,
}

impl ManualClock {
    /// Creates a clock parked at `start`.
    #[must_use]
    pub const fn starting_at(start: u32) -> Self {
        Self { now: start }
    }

    /// Moves the clock forward, wrapping at 2^32 like the hardware counter.
    pub fn advance(&mut self, millis: u32) {
        self.now = self.now.wrapping_add(millis);
    }

    /// Jumps directly to `now`.
    pub fn set(&mut self, now: u32) {
        self.now = now;
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now
    }
}
