//! # intervisor
//!
//! **Intervisor** fans an external interrupt (Ctrl-C, a break request) out to
//! cooperatively scheduled tokio tasks that registered interest, through one
//! supervised dispatcher and one installed bridge.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  SIGINT / raise()            force_interrupt_handler()
//!        │                               │
//!        ▼                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Interrupts (context object)                                 │
//! │  - SignalGate   (defer_signals)                              │
//! │  - BridgeSlot ──► WakeHandle          OwnerSlot ──► TaskId   │
//! │  - Registry     scope → [(owner, Notifier)]                  │
//! │  - TaskTable    TaskId → weak task cell (forced interrupts)  │
//! │  - Bus          broadcast events                             │
//! └──────┬───────────────────────────────────────────────────────┘
//!        ▼
//! ┌──────────────────────┐   crash / panic    ┌──────────────────┐
//! │  HandlerSupervisor   │ ◄───────────────── │    Dispatcher    │
//! │  generation, running │ ─── spawn/restart ►│ simple|interactive│
//! └──────────────────────┘                    └────────┬─────────┘
//!                                                      │ debounce < window?
//!                                                      ├──► force root task
//!                                                      ▼
//!                                     interrupt_all() / interrupt_scope()
//!                                          │          │          │
//!                                          ▼          ▼          ▼
//!                                     handler 1  handler 2  handler N
//!                                  (ctx.wait_for_signal())
//! ```
//!
//! ### Dispatcher lifecycle
//! ```text
//! start_*_handler(force)
//!   ├─► running false→true (or force) ─► publish WakeHandle ─► spawn dispatcher
//!   │
//! loop {
//!   ├─► ctx.suspend(bridge.wait())
//!   │     ├─ bridge closed     ─► return Ok  ─► DispatcherStopped, no restart
//!   │     └─ forced interrupt  ─► return Err ─► DispatcherCrashed ─► restart
//!   ├─► InterruptReceived; diff = now - last; diff < debounce ─► Escalated
//!   └─► simple: interrupt_all()   interactive: menu FSM
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Context**       | Registration, control and signal entry points.               | [`Interrupts`], [`InterruptsBuilder`]       |
//! | **Tasks**         | Managed tasks with interruptible suspension points.          | [`TaskCtx`], [`TaskHandle`], [`TaskId`]     |
//! | **Policies**      | Escalation debounce and restart pacing.                      | [`EscalationPolicy`], [`BackoffPolicy`]     |
//! | **Subscriber API**| Observe runtime events (logging, metrics, tests).            | [`Subscribe`], [`Event`], [`EventKind`]     |
//! | **Collaborators** | Operator menu, process exit/abort, wall clock.               | [`Menu`], [`ProcessControl`], [`Clock`]     |
//! | **Errors**        | Typed errors for registration and dispatchers.               | [`InterruptError`], [`DispatcherError`]     |
//! | **Configuration** | Centralized settings.                                        | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber rendering events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use intervisor::{Config, Interrupts};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn intervisor::Subscribe>> = vec![Arc::new(intervisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn intervisor::Subscribe>> = Vec::new();
//!
//!     let hub = Interrupts::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     // A handler that reacts to the first interrupt and leaves.
//!     let handler = hub.spawn("downloader", |ctx| async move {
//!         ctx.register("net")?;
//!         ctx.wait_for_signal().await?;
//!         ctx.unregister("net")?;
//!         Ok::<_, intervisor::InterruptError>("cancelled")
//!     });
//!
//!     hub.start_simple_handler(false);
//!     while !hub.is_waiting(handler.id()) {
//!         tokio::task::yield_now().await;
//!     }
//!
//!     // What the OS signal listener does on SIGINT.
//!     hub.raise();
//!
//!     assert_eq!(handler.join().await??, "cancelled");
//!     hub.shutdown();
//!     Ok(())
//! }
//! ```

mod clock;
mod config;
mod core;
mod error;
mod events;
mod menu;
mod policies;
mod process;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use core::{
    BridgeClosed, DeferGuard, DispatcherHandle, HandlerKind, Interrupts, InterruptsBuilder,
    MenuState, Notifier, Phase, RootChoice, Scope, WakeHandle,
};
pub use error::{DispatcherError, InterruptError};
pub use events::{Bus, Event, EventKind};
pub use menu::{Menu, MenuError, PromptMenu};
pub use policies::{BackoffPolicy, Escalation, EscalationPolicy, JitterPolicy};
pub use process::{ProcessControl, StdProcess};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{InterruptSignal, TaskCtx, TaskHandle, TaskId, TaskState};

// Optional: expose a simple built-in logger subscriber (demo/reference).
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
