//! # Handler registry: scope → ordered `(owner, notifier)` registrations.
//!
//! One mutex guards the whole map (mutation frequency is low). The lock is
//! synchronous and is **never** held across an `.await`; broadcasting snapshots the
//! notifiers under the lock, releases it, and only then signals them.
//!
//! ## Architecture
//! ```text
//! register(scope, owner)   ─┐
//! unregister(scope, owner) ─┼─► Mutex<BTreeMap<Scope, Vec<Registration>>>
//! find(owner)              ─┤          │
//! scopes() / snapshot_*()  ─┘          └─► Vec<Arc<Notifier>> (released lock)
//!                                                  └─► notifier.notify()
//! ```
//!
//! ## Rules
//! - Registrations are kept in insertion order per scope; scopes iterate in key order.
//! - Duplicate `(scope, owner)` registrations are accepted; `unregister` removes all.
//! - Scopes left without registrations are dropped.
//! - Mutations fail with `RestrictedPhase` while the phase is [`Phase::Snapshot`].
//! - A [`Notifier`] is a condition: `notify()` reaches current waiters only.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::InterruptError;
use crate::tasks::TaskId;

/// Grouping key for handlers (e.g. a library or module name).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scope(Arc<str>);

impl Scope {
    /// Creates a scope from any string-like value.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Scope(name.into())
    }

    /// Returns the scope name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        Scope::new(name)
    }
}

impl From<String> for Scope {
    fn from(name: String) -> Self {
        Scope::new(name)
    }
}

impl From<&Scope> for Scope {
    fn from(scope: &Scope) -> Self {
        scope.clone()
    }
}

/// Lifecycle phase of the hosting process.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Normal execution; registration allowed.
    #[default]
    Runtime = 0,
    /// Ahead-of-time build/snapshot; registration must be deferred.
    Snapshot = 1,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Runtime => f.write_str("runtime"),
            Phase::Snapshot => f.write_str("snapshot"),
        }
    }
}

/// Condition owned by exactly one registration.
#[derive(Debug, Default)]
pub struct Notifier {
    notify: Notify,
    waiting: AtomicUsize,
}

impl Notifier {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wakes every task currently waiting; not latched for later waiters.
    pub fn notify(&self) {
        self.notify.notify_waiters();
    }

    /// Waits for the next `notify`.
    pub async fn wait(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let _waiting = WaitingGuard::enter(&self.waiting);
        notified.await;
    }

    /// Number of tasks currently parked in [`wait`](Self::wait).
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }
}

struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// One `(owner, notifier)` pair.
#[derive(Clone)]
struct Registration {
    owner: TaskId,
    notifier: Arc<Notifier>,
}

/// Mutex-guarded scope → registrations map.
pub(crate) struct Registry {
    scopes: Mutex<BTreeMap<Scope, Vec<Registration>>>,
    phase: AtomicU8,
}

impl Registry {
    pub(crate) fn new(phase: Phase) -> Self {
        Self {
            scopes: Mutex::new(BTreeMap::new()),
            phase: AtomicU8::new(phase as u8),
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        match self.phase.load(Ordering::Acquire) {
            0 => Phase::Runtime,
            _ => Phase::Snapshot,
        }
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn ensure_runtime(&self, op: &'static str) -> Result<(), InterruptError> {
        match self.phase() {
            Phase::Runtime => Ok(()),
            phase => Err(InterruptError::RestrictedPhase { op, phase }),
        }
    }

    /// Appends a registration and returns its notifier.
    pub(crate) fn register(
        &self,
        scope: Scope,
        owner: TaskId,
    ) -> Result<Arc<Notifier>, InterruptError> {
        self.ensure_runtime("register")?;
        let notifier = Notifier::new();
        self.scopes.lock().entry(scope).or_default().push(Registration {
            owner,
            notifier: Arc::clone(&notifier),
        });
        Ok(notifier)
    }

    /// Removes every registration of `owner` under `scope`.
    pub(crate) fn unregister(&self, scope: &Scope, owner: TaskId) -> Result<bool, InterruptError> {
        self.ensure_runtime("unregister")?;
        let mut scopes = self.scopes.lock();
        let Some(list) = scopes.get_mut(scope) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|r| r.owner != owner);
        let removed = list.len() != before;
        if list.is_empty() {
            scopes.remove(scope);
        }
        Ok(removed)
    }

    /// First notifier registered by `owner`, scanning scopes in order.
    pub(crate) fn find(&self, owner: TaskId) -> Result<Arc<Notifier>, InterruptError> {
        self.scopes
            .lock()
            .values()
            .flat_map(|list| list.iter())
            .find(|r| r.owner == owner)
            .map(|r| Arc::clone(&r.notifier))
            .ok_or(InterruptError::NotRegistered { task: owner })
    }

    /// Ordered snapshot of current scopes.
    pub(crate) fn scopes(&self) -> Vec<Scope> {
        self.scopes.lock().keys().cloned().collect()
    }

    /// Notifiers of every registration, in scope then insertion order.
    pub(crate) fn snapshot_all(&self) -> Vec<Arc<Notifier>> {
        self.scopes
            .lock()
            .values()
            .flat_map(|list| list.iter().map(|r| Arc::clone(&r.notifier)))
            .collect()
    }

    /// Notifiers registered under `scope`.
    pub(crate) fn snapshot_scope(&self, scope: &Scope) -> Vec<Arc<Notifier>> {
        self.scopes
            .lock()
            .get(scope)
            .map(|list| list.iter().map(|r| Arc::clone(&r.notifier)).collect())
            .unwrap_or_default()
    }

    /// Total number of registrations.
    pub(crate) fn len(&self) -> usize {
        self.scopes.lock().values().map(Vec::len).sum()
    }

    /// Drops every registration; returns how many were removed.
    pub(crate) fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.scopes.lock());
        drained.values().map(Vec::len).sum()
    }
}
