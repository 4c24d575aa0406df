//! # Escalation policy for rapid repeated interrupts.
//!
//! [`EscalationPolicy`] is a pure function of "time since the last interrupt":
//! a second interrupt inside the debounce window means the operator is insisting,
//! so cooperative notification is complemented by a forced interrupt of the root task.
//!
//! ```text
//! diff = now - last        last = now
//!   diff <  window ─► Escalation::Force   (notify + force root)
//!   diff >= window ─► Escalation::Notify  (notify only)
//! ```
//!
//! The window is measured on the wall clock. A clock stepping backwards yields a
//! negative difference and therefore escalates.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Outcome of one escalation decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Escalation {
    /// Cooperative notification only.
    Notify,
    /// Cooperative notification plus a forced interrupt of the root task.
    Force,
}

/// Debounce window policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EscalationPolicy {
    /// Interrupts closer together than this escalate.
    pub window: Duration,
}

impl Default for EscalationPolicy {
    /// One second.
    fn default() -> Self {
        Self {
            window: Duration::from_secs(1),
        }
    }
}

impl EscalationPolicy {
    /// Decides from the elapsed time since the previous interrupt.
    ///
    /// `None` means the clock went backwards.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use intervisor::{Escalation, EscalationPolicy};
    ///
    /// let policy = EscalationPolicy::default();
    /// assert_eq!(policy.decide(Some(Duration::from_millis(200))), Escalation::Force);
    /// assert_eq!(policy.decide(Some(Duration::from_secs(1))), Escalation::Notify);
    /// ```
    pub fn decide(&self, since_last: Option<Duration>) -> Escalation {
        match since_last {
            Some(diff) if diff >= self.window => Escalation::Notify,
            _ => Escalation::Force,
        }
    }
}

/// Per-loop "last interrupt" bookkeeping.
#[derive(Debug)]
pub(crate) struct Debouncer {
    policy: EscalationPolicy,
    last: SystemTime,
}

impl Debouncer {
    pub(crate) fn new(policy: EscalationPolicy) -> Self {
        Self {
            policy,
            last: UNIX_EPOCH,
        }
    }

    /// Records an interrupt at `now` and decides whether to escalate.
    pub(crate) fn observe(&mut self, now: SystemTime) -> Escalation {
        let diff = now.duration_since(self.last).ok();
        self.last = now;
        self.policy.decide(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_000_000) + Duration::from_millis(ms)
    }

    #[test]
    fn first_interrupt_never_escalates() {
        let mut d = Debouncer::new(EscalationPolicy::default());
        assert_eq!(d.observe(at(0)), Escalation::Notify);
    }

    #[test]
    fn rapid_second_interrupt_escalates_once() {
        let mut d = Debouncer::new(EscalationPolicy::default());
        assert_eq!(d.observe(at(0)), Escalation::Notify);
        assert_eq!(d.observe(at(200)), Escalation::Force);
        assert_eq!(d.observe(at(1_200)), Escalation::Notify);
    }

    #[test]
    fn window_boundary_is_not_escalated() {
        let mut d = Debouncer::new(EscalationPolicy::default());
        d.observe(at(0));
        assert_eq!(d.observe(at(1_000)), Escalation::Notify);
        assert_eq!(d.observe(at(1_999)), Escalation::Force);
    }

    #[test]
    fn clock_going_backwards_escalates() {
        let mut d = Debouncer::new(EscalationPolicy::default());
        d.observe(at(5_000));
        assert_eq!(d.observe(at(1_000)), Escalation::Force);
    }

    #[test]
    fn custom_window() {
        let mut d = Debouncer::new(EscalationPolicy {
            window: Duration::from_millis(50),
        });
        d.observe(at(0));
        assert_eq!(d.observe(at(60)), Escalation::Notify);
        assert_eq!(d.observe(at(100)), Escalation::Force);
    }
}
