//! # Wall-clock source for the debounce window.
//!
//! The dispatcher measures "time since last interrupt" on the wall clock, not a
//! monotonic clock. [`SystemClock`] is the default; [`ManualClock`] lets tests and
//! simulations step time explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> SystemTime;
}

/// [`SystemTime::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only moves when told to.
///
/// ## Example
/// ```
/// use std::time::Duration;
/// use intervisor::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let t0 = clock.now();
/// clock.advance(Duration::from_millis(200));
/// assert_eq!(clock.now().duration_since(t0).unwrap(), Duration::from_millis(200));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Starts at one day past the Unix epoch.
    pub fn new() -> Self {
        Self::starting_at(UNIX_EPOCH + Duration::from_secs(86_400))
    }

    /// Starts at `at` (clamped to the epoch).
    pub fn starting_at(at: SystemTime) -> Self {
        let nanos = at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            .min(u128::from(u64::MAX)) as u64;
        Self {
            nanos: AtomicU64::new(nanos),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let step = by.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.nanos.fetch_add(step, Ordering::AcqRel);
    }

    /// Moves the clock backward (simulates a wall-clock adjustment).
    pub fn rewind(&self, by: Duration) {
        let step = by.as_nanos().min(u128::from(u64::MAX)) as u64;
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                Some(n.saturating_sub(step))
            });
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}
