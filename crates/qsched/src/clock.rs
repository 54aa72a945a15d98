//! Monotonic time sources consumed by the scheduler.
//!
//! All scheduler timestamps are nanoseconds on a clock-specific epoch. Only
//! differences between readings of the same clock are meaningful.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic nanosecond time source.
pub trait Clock: Send + Sync {
    /// Returns the current reading in nanoseconds. Never decreases.
    fn now_ns(&self) -> u64;
}

/// Host monotonic clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        // u64 nanoseconds cover ~584 years of uptime.
        self.epoch.elapsed().as_nanos() as u64
    }
}

/// Clock that only moves when told to. Used to drive [`Scheduler::tick`]
/// deterministically.
///
/// [`Scheduler::tick`]: crate::Scheduler::tick
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(duration_ns(by), Ordering::SeqCst);
    }

    /// Moves the clock to `at_ns`. Readings never go backwards, so earlier
    /// values are ignored.
    pub fn set(&self, at_ns: u64) {
        self.now.fetch_max(at_ns, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub(crate) fn duration_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
