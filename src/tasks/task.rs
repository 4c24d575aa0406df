//! # Managed task identity, state and forced-interrupt slot.
//!
//! Every task spawned through [`Interrupts::spawn`](crate::Interrupts::spawn) owns a
//! [`TaskCell`]: a stable [`TaskId`], a coarse [`TaskState`], and a pending
//! [`InterruptSignal`] slot.
//!
//! ## Forced interrupts
//! ```text
//! force(signal)                          TaskCtx::suspend(fut)
//!   lock(pending)                          wake.notified().enable()
//!   state == Suspended && pending empty?   state = Suspended
//!     ├─ yes → pending = signal            select { fut, wake }
//!     │        wake.notify_waiters()       lock(pending)
//!     └─ no  → no-op (false)               state = Running
//!                                          pending.take() → Err(Interrupted)
//! ```
//!
//! ## Rules
//! - A signal is only injected into a task that is **suspended** at an explicit
//!   suspension point; running or finished tasks are left alone.
//! - The pending slot is checked on the resume boundary, so an injected signal always
//!   surfaces from the suspension point it interrupted.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};

/// Global task id counter; `0` is reserved for "no task".
static TASK_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity-only handle of a managed task.
///
/// Holding a `TaskId` never keeps the task alive; resolve it through the task table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        TaskId(TASK_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw id (e.g. one read from a published slot).
    pub const fn from_raw(raw: u64) -> Self {
        TaskId(raw)
    }

    /// Returns the raw id.
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Coarse scheduling state of a managed task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Executing between suspension points.
    Running = 0,
    /// Parked inside [`TaskCtx::suspend`](crate::TaskCtx::suspend); forced interrupts apply.
    Suspended = 1,
    /// Returned, panicked or aborted.
    Finished = 2,
}

impl TaskState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::Running,
            1 => TaskState::Suspended,
            _ => TaskState::Finished,
        }
    }
}

/// Payload injected into a task by a forced interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterruptSignal {
    /// Wall-clock time the interrupt was forced.
    pub at: SystemTime,
}

impl InterruptSignal {
    /// Creates a signal stamped with the current time.
    pub fn new() -> Self {
        Self {
            at: SystemTime::now(),
        }
    }
}

impl Default for InterruptSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InterruptSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interrupt signal")
    }
}

/// Shared per-task record.
pub(crate) struct TaskCell {
    id: TaskId,
    name: Arc<str>,
    state: AtomicU8,
    pending: Mutex<Option<InterruptSignal>>,
    wake: Notify,
}

impl TaskCell {
    pub(crate) fn new(name: Arc<str>) -> Arc<Self> {
        Arc::new(Self {
            id: TaskId::next(),
            name,
            state: AtomicU8::new(TaskState::Running as u8),
            pending: Mutex::new(None),
            wake: Notify::new(),
        })
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn wake(&self) -> &Notify {
        &self.wake
    }

    /// Marks the task suspended. The caller must have enabled its `wake` waiter first.
    pub(crate) fn enter_suspend(&self) {
        let _pending = self.pending.lock();
        self.state
            .store(TaskState::Suspended as u8, Ordering::Release);
    }

    /// Leaves the suspension point and returns any signal injected meanwhile.
    pub(crate) fn leave_suspend(&self) -> Option<InterruptSignal> {
        let mut pending = self.pending.lock();
        if self.state() == TaskState::Suspended {
            self.state.store(TaskState::Running as u8, Ordering::Release);
        }
        pending.take()
    }

    /// Injects `signal` if the task is suspended; returns whether it was delivered.
    pub(crate) fn force(&self, signal: InterruptSignal) -> bool {
        let mut pending = self.pending.lock();
        if self.state() != TaskState::Suspended || pending.is_some() {
            return false;
        }
        *pending = Some(signal);
        self.wake.notify_waiters();
        true
    }

    pub(crate) fn finish(&self) {
        let mut pending = self.pending.lock();
        self.state.store(TaskState::Finished as u8, Ordering::Release);
        *pending = None;
    }
}

/// Owned handle to a spawned managed task.
///
/// Dropping the handle detaches the task; it keeps running.
pub struct TaskHandle<T> {
    pub(crate) cell: Arc<TaskCell>,
    pub(crate) join: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    /// Returns the task identity.
    pub fn id(&self) -> TaskId {
        self.cell.id()
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        self.cell.name()
    }

    /// Returns the current scheduling state.
    pub fn state(&self) -> TaskState {
        self.cell.state()
    }

    /// True once the task returned, panicked or was aborted.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Aborts the underlying tokio task.
    pub fn abort(&self) {
        self.join.abort();
    }

    /// Waits for the task to complete and returns its output.
    pub async fn join(self) -> Result<T, JoinError> {
        self.join.await
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.cell.id())
            .field("name", &self.cell.name())
            .field("state", &self.cell.state())
            .finish()
    }
}
