//! # Managed tasks.
//!
//! This module provides the cooperative-task model the interrupt core targets:
//! - [`TaskId`] - identity-only task handle (never owning)
//! - [`TaskCtx`] - per-task context with explicit suspension points
//! - [`TaskHandle`] - owned join handle of a spawned task
//! - [`InterruptSignal`] - payload of a forced interrupt

mod ctx;
mod table;
mod task;

pub use ctx::TaskCtx;
pub use task::{InterruptSignal, TaskHandle, TaskId, TaskState};

pub(crate) use table::TaskTable;
pub(crate) use task::TaskCell;
