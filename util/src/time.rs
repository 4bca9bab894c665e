//! General time utility functions

use std::time::{Duration, Instant};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a chrono duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Build a std duration from a number of seconds read out of a parameter file.
///
/// Negative, zero or non-finite values give a zero duration rather than panicking.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::from_secs(0)
    }
}

/// A source of time for control loops.
///
/// Loops never sleep directly, they sleep through their clock. This lets simulations advance
/// their model by exactly the requested time instead of waiting on the wall clock.
pub trait Clock {
    /// Seconds elapsed since the clock was created.
    fn now_s(&self) -> f64;

    /// Block for the given number of seconds.
    fn sleep_s(&mut self, secs: f64);
}

/// A clock which follows real time.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    start: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep_s(&mut self, secs: f64) {
        std::thread::sleep(secs_to_duration(secs))
    }
}
