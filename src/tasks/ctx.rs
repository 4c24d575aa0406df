//! # Task context: explicit suspension points.
//!
//! A [`TaskCtx`] is handed to every managed task. Awaiting through
//! [`TaskCtx::suspend`] marks the task suspended so a forced interrupt can reach it;
//! plain `.await`s elsewhere are not interruptible.
//!
//! ## Example
//! ```rust,no_run
//! use intervisor::{Config, Interrupts, InterruptError};
//!
//! # async fn demo() -> Result<(), InterruptError> {
//! let hub = Interrupts::builder(Config::default()).build();
//! let worker = hub.spawn("worker", |ctx| async move {
//!     ctx.register("net")?;
//!     for _ in 0..3 {
//!         ctx.wait_for_signal().await?;
//!         // stop whatever is in flight, then wait again
//!     }
//!     ctx.unregister("net")?;
//!     Ok::<_, InterruptError>(())
//! });
//! # let _ = worker;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use super::task::{InterruptSignal, TaskCell, TaskId, TaskState};
use crate::core::{Interrupts, Scope};
use crate::error::InterruptError;

/// Handle given to a managed task's body.
#[derive(Clone)]
pub struct TaskCtx {
    cell: Arc<TaskCell>,
    hub: Arc<Interrupts>,
}

impl TaskCtx {
    pub(crate) fn new(cell: Arc<TaskCell>, hub: Arc<Interrupts>) -> Self {
        Self { cell, hub }
    }

    /// Returns this task's identity.
    pub fn id(&self) -> TaskId {
        self.cell.id()
    }

    /// Returns this task's name.
    pub fn name(&self) -> &str {
        self.cell.name()
    }

    /// Returns this task's scheduling state.
    pub fn state(&self) -> TaskState {
        self.cell.state()
    }

    /// Returns the context this task was spawned from.
    pub fn interrupts(&self) -> &Arc<Interrupts> {
        &self.hub
    }

    /// Awaits `fut` as an interruptible suspension point.
    ///
    /// ### Semantics
    /// - While `fut` is pending the task is [`TaskState::Suspended`].
    /// - A forced interrupt drops `fut` and returns [`InterruptError::Interrupted`].
    /// - If an interrupt lands while `fut` completes, the interrupt wins at the
    ///   resume boundary and the output is discarded.
    pub async fn suspend<F: Future>(&self, fut: F) -> Result<F::Output, InterruptError> {
        self.interruptible(fut)
            .await
            .map_err(|signal| InterruptError::Interrupted { signal })
    }

    /// [`suspend`](Self::suspend) yielding the bare signal.
    pub(crate) async fn interruptible<F: Future>(&self, fut: F) -> Result<F::Output, InterruptSignal> {
        let woken = self.cell.wake().notified();
        tokio::pin!(woken);
        woken.as_mut().enable();
        self.cell.enter_suspend();

        let out = tokio::select! {
            biased;
            _ = &mut woken => None,
            out = fut => Some(out),
        };

        match (self.cell.leave_suspend(), out) {
            (Some(signal), _) => Err(signal),
            (None, Some(out)) => Ok(out),
            // Woken without a pending signal cannot happen: `force` sets it first.
            (None, None) => Err(InterruptSignal::default()),
        }
    }

    /// Registers this task under `scope`.
    pub fn register(&self, scope: impl Into<Scope>) -> Result<(), InterruptError> {
        self.hub.register(scope, self.id())
    }

    /// Removes this task's registrations under `scope`.
    pub fn unregister(&self, scope: impl Into<Scope>) -> Result<bool, InterruptError> {
        self.hub.unregister(scope, self.id())
    }

    /// Waits for the next interrupt addressed to this task.
    ///
    /// Interruptible: a forced interrupt also ends the wait, as an error.
    pub async fn wait_for_signal(&self) -> Result<(), InterruptError> {
        self.suspend(self.hub.wait_for_signal(self.id())).await?
    }
}
