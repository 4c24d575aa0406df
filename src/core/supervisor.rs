//! # Handler supervisor: installs the bridge and keeps one dispatcher alive.
//!
//! The supervisor owns the `running` flag, the published [`WakeHandle`] and the
//! active-owner slot. Every start bumps a **generation**; a dispatcher incarnation
//! only touches shared state on exit if its generation is still current, so a
//! replaced or stopped incarnation can never tear down its successor.
//!
//! ## Architecture
//! ```text
//! start(kind, force)
//!   └─► install lock ─► running false→true (or force)
//!                     ─► generation += 1
//!                     ─► publish WakeHandle (new if absent/closed/force; old one closed)
//!                     ─► spawn shell(dispatcher) ─► publish owner id
//!                     ─► [replaced] force-interrupt the previous owner
//!
//! shell
//!   ├─► [restart > 0] sleep(restart_backoff.next(restart - 1))
//!   ├─► dispatcher body (panic caught)
//!   ├─► retire(generation): current? running=false, unpublish bridge + owner
//!   ├─► Interrupted + not current ─► DispatcherStopped
//!   └─► Err + current ─► launch(kind, restart') ─► log ─► DispatcherCrashed ─► DispatcherRestarted
//!
//! stop()
//!   └─► install lock ─► generation += 1 ─► running=false ─► unpublish + close bridge
//!                   ─► force-interrupt the previous owner
//! ```
//!
//! ## Rules
//! - The install lock is a synchronous mutex and is never held across an `.await`.
//! - Bridge and owner slots are written only here (release) and read by the signal path (acquire).
//! - A stale owner id observed by `force_interrupt_handler` is harmless: the task-state
//!   guard in the task cell drops the forced interrupt.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;

use super::bridge::{BridgeSlot, OwnerSlot, WakeHandle};
use super::hub::Interrupts;
use super::{dispatcher, interactive};
use crate::error::DispatcherError;
use crate::events::{Event, EventKind};
use crate::tasks::{TaskCtx, TaskHandle, TaskId};

/// Dispatcher variant driven by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// Broadcast every interrupt to all registered handlers.
    Simple,
    /// Ask the operator what to do through a [`Menu`](crate::Menu).
    Interactive,
}

impl HandlerKind {
    /// Stable label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::Simple => "simple",
            HandlerKind::Interactive => "interactive",
        }
    }

    fn task_name(&self) -> &'static str {
        match self {
            HandlerKind::Simple => "interrupt-dispatcher",
            HandlerKind::Interactive => "interactive-dispatcher",
        }
    }
}

/// Handle to a dispatcher task; joins with the dispatcher's result.
pub type DispatcherHandle = TaskHandle<Result<(), DispatcherError>>;

#[derive(Default)]
struct Install {
    generation: u64,
    kind: Option<HandlerKind>,
}

/// Start/stop/restart bookkeeping for the dispatcher.
#[derive(Default)]
pub(crate) struct HandlerSupervisor {
    running: AtomicBool,
    install: Mutex<Install>,
    pub(crate) bridge: BridgeSlot,
    pub(crate) owner: OwnerSlot,
}

impl HandlerSupervisor {
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn active_kind(&self) -> Option<HandlerKind> {
        let install = self.install.lock();
        if self.is_running() { install.kind } else { None }
    }

    /// Explicit uninstall; the dispatcher observes the closed bridge and stops without restart.
    ///
    /// A dispatcher parked at a suspension point (bridge wait, menu prompt) is
    /// forcibly interrupted so it ends there.
    pub(crate) fn stop(&self, hub: &Interrupts) -> bool {
        let mut install = self.install.lock();
        install.generation += 1;
        install.kind = None;
        self.running.store(false, Ordering::Release);
        let owner = self.owner.load();
        if let Some(owner) = owner {
            self.owner.clear_if(owner);
        }

        let uninstalled = match self.bridge.take() {
            Some(handle) => {
                handle.close();
                hub.publish(
                    Event::new(EventKind::BridgeUninstalled).with_generation(handle.generation()),
                );
                true
            }
            None => false,
        };
        drop(install);

        if let Some(owner) = owner {
            hub.force_interrupt(owner);
        }
        uninstalled
    }

    /// Resets shared state for an exiting incarnation; returns whether it was current.
    fn retire(&self, hub: &Interrupts, generation: u64, bridge: &Arc<WakeHandle>, owner: TaskId) -> bool {
        let mut install = self.install.lock();
        let current = install.generation == generation;

        if current {
            install.kind = None;
            self.running.store(false, Ordering::Release);
            self.owner.clear_if(owner);
            if self.bridge.take_if(bridge) {
                hub.publish(
                    Event::new(EventKind::BridgeUninstalled).with_generation(bridge.generation()),
                );
            }
        }

        let still_published = self
            .bridge
            .load()
            .is_some_and(|installed| Arc::ptr_eq(&installed, bridge));
        if !still_published {
            bridge.close();
        }
        current
    }
}

/// Starts a dispatcher of `kind`; `None` if one is already running and `force` is false.
pub(crate) fn launch(
    hub: &Arc<Interrupts>,
    kind: HandlerKind,
    force: bool,
    restart: u32,
) -> Option<DispatcherHandle> {
    let sup = &hub.supervisor;
    let mut install = sup.install.lock();

    let was_running = sup.running.swap(true, Ordering::AcqRel);
    if was_running && !force {
        return None;
    }
    let replaced = if was_running { sup.owner.load() } else { None };
    install.generation += 1;
    install.kind = Some(kind);
    let generation = install.generation;

    let bridge = match sup.bridge.load() {
        Some(handle) if !force && !handle.is_closed() => handle,
        _ => {
            let handle = WakeHandle::new(generation);
            if let Some(old) = sup.bridge.publish(Arc::clone(&handle)) {
                old.close();
            }
            hub.publish(Event::new(EventKind::BridgeInstalled).with_generation(generation));
            handle
        }
    };

    let shell_hub = Arc::clone(hub);
    let handle = hub.spawn(kind.task_name(), move |ctx| {
        shell(shell_hub, ctx, kind, generation, bridge, restart)
    });
    sup.owner.publish(handle.id());

    hub.publish(
        Event::new(EventKind::DispatcherStarted)
            .with_task(handle.id())
            .with_generation(generation)
            .with_handler(kind)
            .with_attempt(restart),
    );
    drop(install);

    // The replaced incarnation is no longer current: it ends at its next
    // suspension point and is never restarted.
    if let Some(old) = replaced {
        hub.force_interrupt(old);
    }
    Some(handle)
}

async fn shell(
    hub: Arc<Interrupts>,
    ctx: TaskCtx,
    kind: HandlerKind,
    generation: u64,
    bridge: Arc<WakeHandle>,
    restart: u32,
) -> Result<(), DispatcherError> {
    let backoff = hub.config().restart_backoff;
    if restart > 0 {
        let delay = backoff.next(restart - 1);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    let started = tokio::time::Instant::now();

    let outcome = match kind {
        HandlerKind::Simple => {
            AssertUnwindSafe(dispatcher::run(&ctx, &bridge))
                .catch_unwind()
                .await
        }
        HandlerKind::Interactive => {
            AssertUnwindSafe(interactive::run(&ctx, &bridge))
                .catch_unwind()
                .await
        }
    };
    let result = outcome.unwrap_or_else(|payload| Err(DispatcherError::from_panic(payload)));

    let current = hub.supervisor.retire(&hub, generation, &bridge, ctx.id());
    let result = match result {
        Err(DispatcherError::Interrupted { .. }) if !current => Ok(()),
        other => other,
    };
    let base = |event: EventKind| {
        Event::new(event)
            .with_task(ctx.id())
            .with_generation(generation)
            .with_handler(kind)
    };

    match &result {
        Ok(()) => hub.publish(base(EventKind::DispatcherStopped)),
        Err(err) => {
            let replacement = if current {
                let next = backoff.chain(restart, started.elapsed());
                launch(&hub, kind, false, next).map(|handle| (handle.id(), next))
            } else {
                None
            };

            tracing::error!(
                task = %ctx.id(),
                handler = kind.as_str(),
                generation,
                label = err.as_label(),
                error = %err,
                "dispatcher crashed"
            );
            hub.publish(base(EventKind::DispatcherCrashed).with_reason(err.as_message()));

            if let Some((task, attempt)) = replacement {
                hub.publish(
                    Event::new(EventKind::DispatcherRestarted)
                        .with_task(task)
                        .with_handler(kind)
                        .with_attempt(attempt),
                );
            }
        }
    }
    result
}
