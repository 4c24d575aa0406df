//! # Lookup table from [`TaskId`] to live task cells.
//!
//! The table stores only weak references: it resolves identities for forced
//! interrupts but never keeps a finished task alive. Entries are removed when the
//! task finishes (see `FinishGuard` in the hub).

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::task::{TaskCell, TaskId};

#[derive(Default)]
pub(crate) struct TaskTable {
    cells: Mutex<HashMap<TaskId, Weak<TaskCell>>>,
}

impl TaskTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, cell: &Arc<TaskCell>) {
        self.cells.lock().insert(cell.id(), Arc::downgrade(cell));
    }

    pub(crate) fn get(&self, id: TaskId) -> Option<Arc<TaskCell>> {
        self.cells.lock().get(&id).and_then(Weak::upgrade)
    }

    pub(crate) fn remove(&self, id: TaskId) {
        self.cells.lock().remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.cells.lock().len()
    }
}
