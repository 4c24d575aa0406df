//! # Runtime configuration.
//!
//! Provides [`Config`], the centralized settings for an [`Interrupts`](crate::Interrupts)
//! context. Pass it to [`Interrupts::builder`](crate::Interrupts::builder).
//!
//! ## Sentinel values
//! - `debounce = 0s` → escalation disabled (no interval is shorter than zero)
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::core::Phase;
use crate::policies::{BackoffPolicy, EscalationPolicy};

/// Settings for the interrupt core.
///
/// ## Field semantics
/// - `debounce`: two interrupts closer than this escalate to a forced interrupt of the root task
/// - `restart_backoff`: delay policy for replacements of a crashed dispatcher
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `exit_code`: code used by the interactive "exit" action
/// - `phase`: initial process phase; registration is rejected during [`Phase::Snapshot`]
#[derive(Clone, Debug)]
pub struct Config {
    /// Debounce window for escalation (wall clock).
    pub debounce: Duration,

    /// Delay policy applied before a restarted dispatcher enters its loop.
    pub restart_backoff: BackoffPolicy,

    /// Capacity of the event bus broadcast channel.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events observe `Lagged`.
    pub bus_capacity: usize,

    /// Process exit code for the interactive "exit" action.
    pub exit_code: i32,

    /// Phase the context starts in.
    pub phase: Phase,
}

impl Config {
    /// Returns the escalation policy derived from `debounce`.
    #[inline]
    pub fn escalation(&self) -> EscalationPolicy {
        EscalationPolicy {
            window: self.debounce,
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `debounce = 1s`
    /// - `restart_backoff = BackoffPolicy::default()` (50ms doubling up to 5s, equal jitter)
    /// - `bus_capacity = 1024`
    /// - `exit_code = 0`
    /// - `phase = Phase::Runtime`
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(1),
            restart_backoff: BackoffPolicy::default(),
            bus_capacity: 1024,
            exit_code: 0,
            phase: Phase::Runtime,
        }
    }
}
