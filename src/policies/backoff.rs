//! # Backoff policy for dispatcher restarts.
//!
//! When a dispatcher incarnation crashes, the supervisor starts a replacement at
//! once (the bridge is re-installed immediately) but the replacement waits
//! [`BackoffPolicy::next`] before entering its loop. This bounds a crash loop where
//! every incarnation fails on its first wake.
//!
//! The delay for restart `n` (0-indexed) is `first × factor^n`, clamped to `max`,
//! then jitter is applied. Wakes raised during the delay are latched by the bridge.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use intervisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(50),
//!     max: Duration::from_secs(5),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(50));
//! assert_eq!(backoff.next(3), Duration::from_millis(400));
//! assert_eq!(backoff.next(20), Duration::from_secs(5));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Restart delay policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first restart.
    pub first: Duration,
    /// Maximum delay; an incarnation that lived this long resets the chain.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied on top of the clamped delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 50ms`, `factor = 2.0`, `max = 5s`, equal jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(50),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Restart immediately, every time.
    pub const fn immediate() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::ZERO,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Computes the delay for the given restart number (0-indexed).
    pub fn next(&self, restart: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = restart.min(i32::MAX as u32) as i32;
        let unclamped = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !unclamped.is_finite() || unclamped < 0.0 || unclamped > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(unclamped)
        };
        self.jitter.apply(base)
    }

    /// Next restart index after an incarnation that lived `lifetime`.
    ///
    /// Long-lived incarnations start a fresh chain.
    pub fn chain(&self, restart: u32, lifetime: Duration) -> u32 {
        if lifetime >= self.max && self.max > Duration::ZERO {
            0
        } else {
            restart.saturating_add(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(first_ms: u64, max_ms: u64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(first_ms),
            max: Duration::from_millis(max_ms),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn grows_then_clamps() {
        let policy = exp(50, 1_000);
        assert_eq!(policy.next(0), Duration::from_millis(50));
        assert_eq!(policy.next(1), Duration::from_millis(100));
        assert_eq!(policy.next(4), Duration::from_millis(800));
        assert_eq!(policy.next(5), Duration::from_millis(1_000));
        assert_eq!(policy.next(u32::MAX), Duration::from_millis(1_000));
    }

    #[test]
    fn immediate_is_always_zero() {
        let policy = BackoffPolicy::immediate();
        for restart in [0, 1, 10, u32::MAX] {
            assert_eq!(policy.next(restart), Duration::ZERO);
        }
    }

    #[test]
    fn equal_jitter_stays_within_half_and_full() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Equal,
            ..exp(400, 10_000)
        };
        for _ in 0..50 {
            let delay = policy.next(0);
            assert!(delay >= Duration::from_millis(200), "{delay:?}");
            assert!(delay <= Duration::from_millis(400), "{delay:?}");
        }
    }

    #[test]
    fn chain_resets_after_long_lifetime() {
        let policy = exp(50, 1_000);
        assert_eq!(policy.chain(3, Duration::from_millis(10)), 4);
        assert_eq!(policy.chain(3, Duration::from_secs(2)), 0);
        assert_eq!(BackoffPolicy::immediate().chain(7, Duration::from_secs(60)), 8);
    }
}
