//! Escalation and restart policies.
//!
//! ## Contents
//! - [`EscalationPolicy`] when a repeated interrupt escalates to a forced interrupt
//! - [`BackoffPolicy`] how long a restarted dispatcher waits after a crash
//! - [`JitterPolicy`] randomization of restart delays
//!
//! ## Quick wiring
//! ```text
//! Config { debounce, restart_backoff, .. }
//!      ├─► core::dispatcher uses EscalationPolicy { window: debounce }
//!      └─► core::supervisor uses restart_backoff.next(restart) before a replacement runs
//! ```

mod backoff;
mod escalation;
mod jitter;

pub use backoff::BackoffPolicy;
pub use escalation::{Escalation, EscalationPolicy};
pub use jitter::JitterPolicy;

pub(crate) use escalation::Debouncer;
