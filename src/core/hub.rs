//! # Interrupts: the context object tying bridge, registry and supervisor together.
//!
//! One [`Interrupts`] value replaces process-wide globals. It is built by
//! [`InterruptsBuilder`](crate::InterruptsBuilder) and shared as `Arc<Interrupts>`.
//!
//! ## Surfaces
//! - **Registration**: [`register`](Interrupts::register), [`unregister`](Interrupts::unregister),
//!   [`wait_for_signal`](Interrupts::wait_for_signal)
//! - **Control**: [`start_simple_handler`](Interrupts::start_simple_handler),
//!   [`start_interactive_handler`](Interrupts::start_interactive_handler),
//!   [`stop_handler`](Interrupts::stop_handler), [`shutdown`](Interrupts::shutdown)
//! - **Signal path**: [`raise`](Interrupts::raise),
//!   [`force_interrupt_handler`](Interrupts::force_interrupt_handler)
//! - **Managed tasks**: [`spawn`](Interrupts::spawn), [`set_root_task`](Interrupts::set_root_task)
//!
//! ## Example
//! ```rust
//! use intervisor::{Config, Interrupts};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let hub = Interrupts::builder(Config::default()).build();
//!
//!     let worker = hub.spawn("worker", |ctx| async move {
//!         ctx.register("io")?;
//!         ctx.wait_for_signal().await?;
//!         ctx.unregister("io")
//!     });
//!
//!     hub.start_simple_handler(false);
//!     while !hub.is_waiting(worker.id()) {
//!         tokio::task::yield_now().await;
//!     }
//!     hub.raise();
//!
//!     assert_eq!(worker.join().await.unwrap(), Ok(true));
//!     hub.shutdown();
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::bridge::SignalGate;
use super::registry::{Phase, Registry, Scope};
use super::supervisor::{DispatcherHandle, HandlerKind, HandlerSupervisor, launch};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::InterruptError;
use crate::events::{Bus, Event, EventKind};
use crate::menu::Menu;
use crate::process::ProcessControl;
use crate::tasks::{InterruptSignal, TaskCell, TaskCtx, TaskHandle, TaskId, TaskTable};

/// Interrupt coordination context.
pub struct Interrupts {
    cfg: Config,
    bus: Bus,
    registry: Registry,
    tasks: Arc<TaskTable>,
    pub(crate) supervisor: HandlerSupervisor,
    pub(crate) gate: SignalGate,
    root: AtomicU64,
    clock: Arc<dyn Clock>,
    menu: Arc<dyn Menu>,
    process: Arc<dyn ProcessControl>,
    listener: CancellationToken,
}

impl Interrupts {
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        clock: Arc<dyn Clock>,
        menu: Arc<dyn Menu>,
        process: Arc<dyn ProcessControl>,
        listener: CancellationToken,
    ) -> Self {
        Self {
            registry: Registry::new(cfg.phase),
            cfg,
            bus,
            tasks: Arc::new(TaskTable::new()),
            supervisor: HandlerSupervisor::default(),
            gate: SignalGate::default(),
            root: AtomicU64::new(0),
            clock,
            menu,
            process,
            listener,
        }
    }

    /// Configuration this context was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn menu(&self) -> &dyn Menu {
        self.menu.as_ref()
    }

    pub(crate) fn process(&self) -> &dyn ProcessControl {
        self.process.as_ref()
    }

    pub(crate) fn publish(&self, ev: Event) {
        self.bus.publish(ev);
    }

    /// Subscribes to runtime events published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // ---- managed tasks ----

    /// Spawns `f` as a managed task.
    ///
    /// The task gets a [`TaskCtx`] for registration and interruptible suspension.
    /// Its cell leaves the task table when the future completes, panics or is aborted.
    pub fn spawn<F, Fut, T>(self: &Arc<Self>, name: impl Into<Arc<str>>, f: F) -> TaskHandle<T>
    where
        F: FnOnce(TaskCtx) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let cell = TaskCell::new(name.into());
        self.tasks.insert(&cell);

        let guard = FinishGuard {
            cell: Arc::clone(&cell),
            tasks: Arc::clone(&self.tasks),
        };
        let fut = f(TaskCtx::new(Arc::clone(&cell), Arc::clone(self)));
        let join = tokio::spawn(async move {
            let _guard = guard;
            fut.await
        });
        TaskHandle { cell, join }
    }

    /// Designates the target of escalated (forced) interrupts.
    pub fn set_root_task(&self, id: TaskId) {
        self.root.store(id.as_raw(), Ordering::Release);
    }

    /// Current escalation target, if any.
    pub fn root_task(&self) -> Option<TaskId> {
        match self.root.load(Ordering::Acquire) {
            0 => None,
            raw => Some(TaskId::from_raw(raw)),
        }
    }

    // ---- registration ----

    /// Registers `owner` under `scope`.
    ///
    /// Duplicates are accepted; each one is notified on broadcast.
    pub fn register(&self, scope: impl Into<Scope>, owner: TaskId) -> Result<(), InterruptError> {
        let scope = scope.into();
        self.registry.register(scope.clone(), owner)?;
        self.publish(
            Event::new(EventKind::HandlerRegistered)
                .with_task(owner)
                .with_scope(scope),
        );
        Ok(())
    }

    /// Removes every registration of `owner` under `scope`; true if any existed.
    pub fn unregister(&self, scope: impl Into<Scope>, owner: TaskId) -> Result<bool, InterruptError> {
        let scope = scope.into();
        let removed = self.registry.unregister(&scope, owner)?;
        if removed {
            self.publish(
                Event::new(EventKind::HandlerUnregistered)
                    .with_task(owner)
                    .with_scope(scope),
            );
        }
        Ok(removed)
    }

    /// Waits on the notifier of `owner`'s first registration (scope order).
    ///
    /// Only wakes observed while waiting count; a broadcast that happened before
    /// this call is not replayed.
    pub async fn wait_for_signal(&self, owner: TaskId) -> Result<(), InterruptError> {
        let notifier = self.registry.find(owner)?;
        notifier.wait().await;
        Ok(())
    }

    /// True while `owner` is parked in [`wait_for_signal`](Self::wait_for_signal).
    pub fn is_waiting(&self, owner: TaskId) -> bool {
        self.registry
            .find(owner)
            .is_ok_and(|notifier| notifier.waiting() > 0)
    }

    /// Ordered snapshot of scopes with at least one registration.
    pub fn scopes(&self) -> Vec<Scope> {
        self.registry.scopes()
    }

    pub fn phase(&self) -> Phase {
        self.registry.phase()
    }

    /// Switches phase; registry mutations fail during [`Phase::Snapshot`].
    pub fn set_phase(&self, phase: Phase) {
        self.registry.set_phase(phase);
    }

    // ---- notification ----

    /// Signals every registered notifier; returns how many.
    pub fn interrupt_all(&self) -> usize {
        let notifiers = self.registry.snapshot_all();
        for notifier in &notifiers {
            notifier.notify();
        }
        self.publish(Event::new(EventKind::Broadcast).with_count(notifiers.len()));
        notifiers.len()
    }

    /// Signals the notifiers registered under `scope`; returns how many.
    pub fn interrupt_scope(&self, scope: &Scope) -> usize {
        let notifiers = self.registry.snapshot_scope(scope);
        for notifier in &notifiers {
            notifier.notify();
        }
        self.publish(
            Event::new(EventKind::ScopeInterrupted)
                .with_scope(scope.clone())
                .with_count(notifiers.len()),
        );
        notifiers.len()
    }

    /// Injects an [`InterruptSignal`] into `target` if it is suspended.
    ///
    /// Returns `false` (no error) when the target is gone, running, or already
    /// has a pending signal.
    pub fn force_interrupt(&self, target: TaskId) -> bool {
        let Some(cell) = self.tasks.get(target) else {
            self.publish(
                Event::new(EventKind::ForceSkipped)
                    .with_task(target)
                    .with_reason("no_target"),
            );
            return false;
        };

        if cell.force(InterruptSignal::new()) {
            self.publish(Event::new(EventKind::ForceDelivered).with_task(target));
            true
        } else {
            self.publish(
                Event::new(EventKind::ForceSkipped)
                    .with_task(target)
                    .with_reason("not_suspended"),
            );
            false
        }
    }

    /// Forces the root task (see [`set_root_task`](Self::set_root_task)).
    pub fn force_interrupt_root(&self) -> bool {
        match self.root_task() {
            Some(root) => self.force_interrupt(root),
            None => {
                self.publish(Event::new(EventKind::ForceSkipped).with_reason("no_target"));
                false
            }
        }
    }

    /// Forces the active dispatcher, read from the published owner slot.
    ///
    /// The dispatcher crashes with `DispatcherError::Interrupted` and is restarted.
    pub fn force_interrupt_handler(&self) -> bool {
        match self.supervisor.owner.load() {
            Some(owner) => self.force_interrupt(owner),
            None => {
                self.publish(Event::new(EventKind::ForceSkipped).with_reason("no_target"));
                false
            }
        }
    }

    // ---- signal path ----

    /// External interrupt entry point.
    ///
    /// Wakes the installed bridge; returns whether one was installed. While
    /// [`defer_signals`](Self::defer_signals) guards are alive the wake is held back
    /// and `false` is returned.
    pub fn raise(&self) -> bool {
        if self.gate.defer() {
            self.publish(Event::new(EventKind::InterruptDeferred));
            return false;
        }
        self.wake_bridge()
    }

    pub(crate) fn wake_bridge(&self) -> bool {
        let delivered = self.supervisor.bridge.signal();
        let ev = Event::new(EventKind::InterruptRaised);
        self.publish(if delivered { ev } else { ev.with_reason("no_bridge") });
        delivered
    }

    // ---- control ----

    /// Starts the broadcasting dispatcher.
    ///
    /// `None` if a dispatcher is already running and `force` is false. With
    /// `force`, a fresh bridge replaces the old one and the old dispatcher stops.
    pub fn start_simple_handler(self: &Arc<Self>, force: bool) -> Option<DispatcherHandle> {
        launch(self, HandlerKind::Simple, force, 0)
    }

    /// Starts the menu-driven dispatcher. Same start rules as
    /// [`start_simple_handler`](Self::start_simple_handler).
    pub fn start_interactive_handler(self: &Arc<Self>, force: bool) -> Option<DispatcherHandle> {
        launch(self, HandlerKind::Interactive, force, 0)
    }

    /// Uninstalls the bridge; the dispatcher stops without restart.
    ///
    /// Returns whether a bridge was installed.
    pub fn stop_handler(&self) -> bool {
        self.supervisor.stop(self)
    }

    /// Stops the dispatcher and drops every registration; returns how many were dropped.
    ///
    /// Subscribers receive the events published so far, then their workers exit.
    pub fn shutdown(&self) -> usize {
        self.stop_handler();
        self.listener.cancel();
        let cleared = self.registry.clear();
        tracing::debug!(cleared, "interrupt context shut down");
        cleared
    }

    // ---- introspection ----

    /// True while a dispatcher incarnation is active.
    pub fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    /// Variant of the active dispatcher.
    pub fn active_handler(&self) -> Option<HandlerKind> {
        self.supervisor.active_kind()
    }

    /// Task id published as the active dispatcher.
    pub fn active_dispatcher(&self) -> Option<TaskId> {
        self.supervisor.owner.load()
    }

    /// True while a bridge handle is published.
    pub fn bridge_installed(&self) -> bool {
        self.supervisor.bridge.load().is_some()
    }

    /// Number of registrations across all scopes (duplicates included).
    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of managed tasks that have not finished yet.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Drop for Interrupts {
    fn drop(&mut self) {
        self.listener.cancel();
    }
}

struct FinishGuard {
    cell: Arc<TaskCell>,
    tasks: Arc<TaskTable>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.cell.finish();
        self.tasks.remove(self.cell.id());
    }
}
