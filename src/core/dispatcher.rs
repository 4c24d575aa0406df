//! # Interrupt dispatcher (simple variant).
//!
//! ```text
//!   ┌──────────── Waiting ◄─────────────┐
//!   │  ctx.interruptible(bridge.wait()) │
//!   │     ├─ BridgeClosed ─► Stopped    │
//!   │     └─ forced interrupt ─► Err    │
//!   ▼                                   │
//! Dispatching                           │
//!   ├─ debounce: diff < window ─► force root task
//!   └─ interrupt_all() ─────────────────┘
//! ```

use super::bridge::WakeHandle;
use crate::error::DispatcherError;
use crate::events::{Event, EventKind};
use crate::policies::{Debouncer, Escalation};
use crate::tasks::TaskCtx;

/// Broadcast loop: every interrupt wakes every registered handler.
pub(crate) async fn run(ctx: &TaskCtx, bridge: &WakeHandle) -> Result<(), DispatcherError> {
    let hub = ctx.interrupts();
    let mut debouncer = Debouncer::new(hub.config().escalation());

    while receive(ctx, bridge, &mut debouncer).await? {
        hub.interrupt_all();
    }
    Ok(())
}

/// Waits for the next wake and applies escalation.
///
/// `Ok(false)` once the bridge is closed.
pub(crate) async fn receive(
    ctx: &TaskCtx,
    bridge: &WakeHandle,
    debouncer: &mut Debouncer,
) -> Result<bool, DispatcherError> {
    if ctx.interruptible(bridge.wait()).await?.is_err() {
        return Ok(false);
    }

    let hub = ctx.interrupts();
    hub.publish(
        Event::new(EventKind::InterruptReceived)
            .with_task(ctx.id())
            .with_generation(bridge.generation()),
    );

    if debouncer.observe(hub.clock().now()) == Escalation::Force {
        tracing::warn!(task = %ctx.id(), "repeated interrupt, forcing root task");
        hub.publish(Event::new(EventKind::Escalated).with_task(ctx.id()));
        hub.force_interrupt_root();
    }
    Ok(true)
}
