//! Shared timing utilities

use std::time::Instant;

/// Microseconds in one second
pub const ONE_SECOND: u64 = 1_000_000;

/// Monotonic microsecond clock starting at zero
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Microseconds since the clock was created
    #[inline]
    pub fn now(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Fires at most once per interval
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    interval: u64,
    last: u64,
}

impl Cadence {
    /// `interval` in microseconds; the first tick at or after `interval` is due
    pub fn new(interval: u64) -> Self {
        Self { interval, last: 0 }
    }

    /// Cadence firing `rate` times per second
    pub fn per_second(rate: u32) -> Self {
        Self::new(ONE_SECOND / u64::from(rate.max(1)))
    }

    #[inline]
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Microseconds since the last mark, saturating if the clock went backwards
    #[inline]
    pub fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.last)
    }

    #[inline]
    pub fn due(&self, now: u64) -> bool {
        self.elapsed(now) >= self.interval
    }

    #[inline]
    pub fn mark(&mut self, now: u64) {
        self.last = now;
    }
}
