//! Error types used by the intervisor runtime and handler tasks.
//!
//! This module defines two main error enums:
//!
//! - [`InterruptError`] errors surfaced synchronously to callers of the
//!   registration API and to tasks suspended through [`TaskCtx`](crate::TaskCtx).
//! - [`DispatcherError`] unexpected failures of a dispatcher incarnation; they are
//!   logged, trigger an automatic restart, and are returned from the dispatcher's
//!   [`TaskHandle`](crate::TaskHandle).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

use crate::core::Phase;
use crate::menu::MenuError;
use crate::tasks::{InterruptSignal, TaskId};

/// # Errors produced by the registration API and suspension points.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterruptError {
    /// Registration was attempted while the context is in a restricted phase.
    ///
    /// Handlers must be registered at normal runtime, never while a snapshot is
    /// being produced.
    #[error("cannot {op} interrupt handlers during the {phase} phase")]
    RestrictedPhase {
        /// The rejected operation (`register` or `unregister`).
        op: &'static str,
        /// The phase the context was in.
        phase: Phase,
    },

    /// The task looked up a notifier it never registered.
    #[error("{task} has no registered interrupt handler")]
    NotRegistered {
        /// The task that was looked up.
        task: TaskId,
    },

    /// A forced interrupt was delivered while the task was suspended.
    #[error("{signal}")]
    Interrupted {
        /// The payload injected by the forced interrupt.
        signal: InterruptSignal,
    },
}

impl InterruptError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use intervisor::{InterruptError, TaskId};
    ///
    /// let err = InterruptError::NotRegistered { task: TaskId::from_raw(7) };
    /// assert_eq!(err.as_label(), "handler_not_registered");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            InterruptError::RestrictedPhase { .. } => "registry_restricted_phase",
            InterruptError::NotRegistered { .. } => "handler_not_registered",
            InterruptError::Interrupted { .. } => "task_interrupted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            InterruptError::RestrictedPhase { op, phase } => {
                format!("{op} rejected: phase={phase}")
            }
            InterruptError::NotRegistered { task } => format!("not registered: {task}"),
            InterruptError::Interrupted { signal } => format!("forced: {signal}"),
        }
    }

    /// True if this error carries a forced interrupt.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, InterruptError::Interrupted { .. })
    }
}

/// # Unexpected failures of a dispatcher incarnation.
///
/// Any of these makes the supervisor reset the running flag, unpublish the bridge
/// and start a replacement dispatcher of the same kind.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatcherError {
    /// The dispatcher task itself was forcibly interrupted.
    #[error("dispatcher interrupted: {signal}")]
    Interrupted {
        /// The injected payload.
        signal: InterruptSignal,
    },

    /// The interactive menu failed.
    #[error("menu failed: {error}")]
    Menu {
        /// The underlying menu error.
        error: MenuError,
    },

    /// The loop body panicked.
    #[error("dispatcher panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl DispatcherError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use intervisor::DispatcherError;
    ///
    /// let err = DispatcherError::Panicked { info: "boom".into() };
    /// assert_eq!(err.as_label(), "dispatcher_panicked");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatcherError::Interrupted { .. } => "dispatcher_interrupted",
            DispatcherError::Menu { .. } => "dispatcher_menu_failed",
            DispatcherError::Panicked { .. } => "dispatcher_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DispatcherError::Interrupted { signal } => format!("interrupted: {signal}"),
            DispatcherError::Menu { error } => format!("menu: {error}"),
            DispatcherError::Panicked { info } => format!("panic: {info}"),
        }
    }

    /// Builds a [`DispatcherError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        DispatcherError::Panicked { info }
    }
}

impl From<InterruptSignal> for DispatcherError {
    fn from(signal: InterruptSignal) -> Self {
        DispatcherError::Interrupted { signal }
    }
}

impl From<MenuError> for DispatcherError {
    fn from(error: MenuError) -> Self {
        DispatcherError::Menu { error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_maps_to_dispatcher_interrupted() {
        let signal = InterruptSignal::new();
        let err: DispatcherError = signal.into();
        assert_eq!(err, DispatcherError::Interrupted { signal });
        assert_eq!(err.as_label(), "dispatcher_interrupted");
        assert!(err.as_message().starts_with("interrupted: "));
    }

    #[test]
    fn restricted_phase_names_the_phase() {
        let err = InterruptError::RestrictedPhase {
            op: "register",
            phase: Phase::Snapshot,
        };
        assert_eq!(err.as_label(), "registry_restricted_phase");
        assert!(err.as_message().contains("snapshot"));
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let err = DispatcherError::from_panic(Box::new("boom"));
        assert_eq!(err.as_message(), "panic: boom");
        let err = DispatcherError::from_panic(Box::new(String::from("owned")));
        assert_eq!(err.as_message(), "panic: owned");
        let err = DispatcherError::from_panic(Box::new(42_u8));
        assert_eq!(err.as_message(), "panic: unknown panic");
    }
}
