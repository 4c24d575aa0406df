//! # Runtime events emitted by the bridge, dispatcher and supervisor.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Signal events**: raw interrupts entering the bridge (raised, deferred, received)
//! - **Delivery events**: what the dispatcher did with them (broadcast, scope, escalation, force)
//! - **Registry events**: handlers joining and leaving scopes
//! - **Lifecycle events**: bridge installation and dispatcher incarnations
//!
//! The [`Event`] struct carries optional metadata such as task id, scope, counts and
//! generation numbers.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use intervisor::{Event, EventKind, Scope};
//!
//! let ev = Event::new(EventKind::ScopeInterrupted)
//!     .with_scope(Scope::from("net"))
//!     .with_count(2);
//!
//! assert_eq!(ev.kind, EventKind::ScopeInterrupted);
//! assert_eq!(ev.scope.as_ref().map(|s| s.as_str()), Some("net"));
//! assert_eq!(ev.count, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::{HandlerKind, Scope};
use crate::tasks::TaskId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: `subscriber=<name> info=<panic>`
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: `subscriber=<name> reason=<full|closed>`
    SubscriberOverflow,

    // === Signal events ===
    /// External interrupt entered the bridge.
    ///
    /// Sets:
    /// - `reason`: `"no_bridge"` when nothing was installed to receive it
    InterruptRaised,

    /// Interrupt recorded while deferral is active; delivered when the last guard drops.
    InterruptDeferred,

    /// Dispatcher woke up for an interrupt.
    ///
    /// Sets:
    /// - `task`: dispatcher task
    /// - `generation`: supervisor generation
    InterruptReceived,

    // === Delivery events ===
    /// Second interrupt inside the debounce window.
    ///
    /// Sets:
    /// - `task`: dispatcher task
    Escalated,

    /// Forced interrupt injected into a suspended task.
    ///
    /// Sets:
    /// - `task`: target task
    ForceDelivered,

    /// Forced interrupt dropped (target missing, not suspended, or already pending).
    ///
    /// Sets:
    /// - `task`: target task, if one was resolved
    /// - `reason`: `no_target` / `not_suspended`
    ForceSkipped,

    /// Every registered notifier was signaled.
    ///
    /// Sets:
    /// - `count`: notifiers signaled
    Broadcast,

    /// Notifiers of a single scope were signaled.
    ///
    /// Sets:
    /// - `scope`: the scope
    /// - `count`: notifiers signaled
    ScopeInterrupted,

    // === Registry events ===
    /// Handler registered.
    ///
    /// Sets:
    /// - `task`, `scope`
    HandlerRegistered,

    /// Handler registrations removed.
    ///
    /// Sets:
    /// - `task`, `scope`
    HandlerUnregistered,

    // === Lifecycle events ===
    /// A fresh bridge handle was published.
    ///
    /// Sets:
    /// - `generation`
    BridgeInstalled,

    /// The bridge handle was unpublished and closed.
    ///
    /// Sets:
    /// - `generation`
    BridgeUninstalled,

    /// A dispatcher incarnation entered its loop.
    ///
    /// Sets:
    /// - `task`, `generation`, `handler`, `attempt` (restart index, 0 for a fresh start)
    DispatcherStarted,

    /// A dispatcher incarnation ended without a restart: bridge closed, stop action,
    /// or interrupted after it was replaced or stopped.
    ///
    /// Sets:
    /// - `task`, `generation`, `handler`
    DispatcherStopped,

    /// A dispatcher incarnation failed unexpectedly.
    ///
    /// Sets:
    /// - `task`, `generation`, `handler`, `reason`
    DispatcherCrashed,

    /// A replacement for a crashed dispatcher was started.
    ///
    /// Sets:
    /// - `task` (replacement), `handler`, `attempt`
    DispatcherRestarted,

    /// Operator picked an entry in the interactive menu.
    ///
    /// Sets:
    /// - `reason`: action label
    /// - `scope`: selected scope (scope menu only)
    MenuSelected,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Task the event is about.
    pub task: Option<TaskId>,
    /// Scope the event is about.
    pub scope: Option<Scope>,
    /// Human-readable reason (errors, labels).
    pub reason: Option<Arc<str>>,
    /// Number of notifiers signaled.
    pub count: Option<u32>,
    /// Restart index of a dispatcher incarnation.
    pub attempt: Option<u32>,
    /// Supervisor generation.
    pub generation: Option<u64>,
    /// Dispatcher variant.
    pub handler: Option<HandlerKind>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            scope: None,
            reason: None,
            count: None,
            attempt: None,
            generation: None,
            handler: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, task: TaskId) -> Self {
        self.task = Some(task);
        self
    }

    /// Attaches a scope.
    #[inline]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a notifier count (saturating at `u32::MAX`).
    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a restart index.
    #[inline]
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    /// Attaches a supervisor generation.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches the dispatcher variant.
    #[inline]
    pub fn with_handler(mut self, handler: HandlerKind) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}
