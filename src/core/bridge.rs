//! # Wakeable bridge between the external signal source and the dispatcher.
//!
//! The bridge is the only contract with the signal path:
//! - [`BridgeSlot`] holds the currently installed [`WakeHandle`]; the supervisor is its
//!   only writer (release), the signal path loads it (acquire) and calls [`WakeHandle::wake`].
//! - [`OwnerSlot`] holds the active dispatcher's [`TaskId`] for forced-interrupt targeting.
//! - [`SignalGate`] defers wakes while a critical section holds a deferral guard.
//!
//! ## Architecture
//! ```text
//! SIGINT / raise()
//!     │
//!     ├─► SignalGate: deferred? ──yes──► remember one pending wake
//!     │        │ no
//!     ▼        ▼
//!  BridgeSlot.load() ──► WakeHandle.wake() ──► dispatcher: WakeHandle.wait()
//!                         (one latched permit;     └─► Ok(())       → dispatch
//!                          repeated wakes coalesce)  └─► BridgeClosed → stop
//! ```
//!
//! ## Rules
//! - `wake()` never blocks and never allocates.
//! - A wake delivered while no task waits is latched (one permit), not lost.
//! - `close()` is permanent and wakes every waiter with [`BridgeClosed`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::sync::Notify;

use crate::tasks::TaskId;

/// Returned by [`WakeHandle::wait`] once the handle has been closed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("interrupt bridge closed")]
pub struct BridgeClosed;

/// Process-wide wake target installed by the supervisor.
#[derive(Debug)]
pub struct WakeHandle {
    generation: u64,
    notify: Notify,
    closed: AtomicBool,
}

impl WakeHandle {
    pub(crate) fn new(generation: u64) -> Arc<Self> {
        Arc::new(Self {
            generation,
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Supervisor generation that installed this handle.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wakes the waiting dispatcher (or latches one wake for the next wait).
    pub fn wake(&self) {
        if !self.is_closed() {
            self.notify.notify_one();
        }
    }

    /// Permanently closes the handle and releases all waiters.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// True once [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Waits for the next wake.
    pub async fn wait(&self) -> Result<(), BridgeClosed> {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_closed() {
            return Err(BridgeClosed);
        }
        notified.await;
        if self.is_closed() {
            return Err(BridgeClosed);
        }
        Ok(())
    }
}

/// Published bridge target.
#[derive(Default)]
pub(crate) struct BridgeSlot {
    current: ArcSwapOption<WakeHandle>,
}

impl BridgeSlot {
    pub(crate) fn load(&self) -> Option<Arc<WakeHandle>> {
        self.current.load_full()
    }

    /// Publishes `handle`, returning the previously installed one.
    pub(crate) fn publish(&self, handle: Arc<WakeHandle>) -> Option<Arc<WakeHandle>> {
        self.current.swap(Some(handle))
    }

    /// Unpublishes the handle, returning it.
    pub(crate) fn take(&self) -> Option<Arc<WakeHandle>> {
        self.current.swap(None)
    }

    /// Unpublishes `handle` only if it is still the installed one.
    pub(crate) fn take_if(&self, handle: &Arc<WakeHandle>) -> bool {
        let current = self.current.load_full();
        if current.is_some_and(|cur| Arc::ptr_eq(&cur, handle)) {
            self.current.store(None);
            true
        } else {
            false
        }
    }

    /// Wakes the installed handle; returns whether one was installed.
    pub(crate) fn signal(&self) -> bool {
        let current = self.current.load();
        match &*current {
            Some(handle) => {
                handle.wake();
                true
            }
            None => false,
        }
    }
}

/// Published active-dispatcher identity (`0` = none).
#[derive(Default)]
pub(crate) struct OwnerSlot {
    raw: AtomicU64,
}

impl OwnerSlot {
    pub(crate) fn publish(&self, id: TaskId) {
        self.raw.store(id.as_raw(), Ordering::Release);
    }

    pub(crate) fn load(&self) -> Option<TaskId> {
        match self.raw.load(Ordering::Acquire) {
            0 => None,
            raw => Some(TaskId::from_raw(raw)),
        }
    }

    /// Clears the slot if it still names `id`.
    pub(crate) fn clear_if(&self, id: TaskId) {
        let _ = self
            .raw
            .compare_exchange(id.as_raw(), 0, Ordering::AcqRel, Ordering::Acquire);
    }
}

/// Deferral counter for incoming signals.
#[derive(Default)]
pub(crate) struct SignalGate {
    depth: AtomicUsize,
    deferred: AtomicBool,
}

impl SignalGate {
    pub(crate) fn enter(&self) {
        self.depth.fetch_add(1, Ordering::AcqRel);
    }

    /// Leaves one deferral level; true if a deferred wake must be delivered now.
    pub(crate) fn leave(&self) -> bool {
        if self.depth.fetch_sub(1, Ordering::AcqRel) == 1 {
            return self.deferred.swap(false, Ordering::AcqRel);
        }
        false
    }

    /// Records a wake if deferral is active; true if the wake was deferred.
    pub(crate) fn defer(&self) -> bool {
        if self.depth.load(Ordering::Acquire) == 0 {
            return false;
        }
        self.deferred.store(true, Ordering::Release);
        // The last guard may have left between the check and the store.
        if self.depth.load(Ordering::Acquire) == 0 {
            return !self.deferred.swap(false, Ordering::AcqRel);
        }
        true
    }

    pub(crate) fn is_deferring(&self) -> bool {
        self.depth.load(Ordering::Acquire) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn latched_wake_is_not_lost() {
        let handle = WakeHandle::new(1);
        handle.wake();
        handle.wake();
        assert_eq!(handle.wait().await, Ok(()));

        // The two wakes coalesced into one permit.
        let second = tokio::time::timeout(Duration::from_millis(20), handle.wait()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn close_releases_waiters() {
        let handle = WakeHandle::new(1);
        let waiter = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.wait().await })
        };
        tokio::task::yield_now().await;
        handle.close();
        assert_eq!(waiter.await.ok(), Some(Err(BridgeClosed)));
        assert_eq!(handle.wait().await, Err(BridgeClosed));

        // Wakes after close are ignored.
        handle.wake();
        assert_eq!(handle.wait().await, Err(BridgeClosed));
    }

    #[test]
    fn slot_take_if_respects_identity() {
        let slot = BridgeSlot::default();
        let first = WakeHandle::new(1);
        let second = WakeHandle::new(2);

        assert!(!slot.signal());
        assert!(slot.publish(Arc::clone(&first)).is_none());
        let old = slot.publish(Arc::clone(&second));
        assert!(old.is_some_and(|h| Arc::ptr_eq(&h, &first)));

        assert!(!slot.take_if(&first));
        assert!(slot.take_if(&second));
        assert!(slot.load().is_none());
    }

    #[test]
    fn owner_slot_clears_only_matching_id() {
        let slot = OwnerSlot::default();
        assert_eq!(slot.load(), None);
        slot.publish(TaskId::from_raw(5));
        slot.clear_if(TaskId::from_raw(6));
        assert_eq!(slot.load(), Some(TaskId::from_raw(5)));
        slot.clear_if(TaskId::from_raw(5));
        assert_eq!(slot.load(), None);
    }

    #[test]
    fn gate_coalesces_deferred_wakes() {
        let gate = SignalGate::default();
        assert!(!gate.defer());

        gate.enter();
        gate.enter();
        assert!(gate.defer());
        assert!(gate.defer());
        assert!(!gate.leave());
        assert!(gate.is_deferring());
        assert!(gate.leave());
        assert!(!gate.is_deferring());

        gate.enter();
        assert!(!gate.leave());
    }
}
