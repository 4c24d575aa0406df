//! Interrupt core: bridge, registry, dispatchers and their supervisor.
//!
//! The only entry point is [`Interrupts`], built through [`InterruptsBuilder`].
//!
//! Internal modules:
//! - [`bridge`]: wake handle, published slots, signal deferral gate;
//! - [`registry`]: scope → `(owner, notifier)` map;
//! - [`dispatcher`]: simple broadcast loop and the shared wake/escalation step;
//! - [`interactive`]: menu-driven dispatcher FSM;
//! - [`supervisor`]: start, stop and restart-on-crash of dispatchers;
//! - [`signals`]: OS signal listener and [`DeferGuard`];
//! - [`hub`], [`builder`]: the context object and its builder.

mod bridge;
mod builder;
mod dispatcher;
mod hub;
mod interactive;
mod registry;
mod signals;
mod supervisor;

pub use bridge::{BridgeClosed, WakeHandle};
pub use builder::InterruptsBuilder;
pub use hub::Interrupts;
pub use interactive::{MenuState, RootChoice};
pub use registry::{Notifier, Phase, Scope};
pub use signals::DeferGuard;
pub use supervisor::{DispatcherHandle, HandlerKind};
