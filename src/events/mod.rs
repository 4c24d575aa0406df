//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Interrupts` (raise, registration, forced interrupts),
//!   dispatcher loops, the handler supervisor, `SubscriberSet` workers.
//! - **Consumers**: the subscriber listener spawned by `InterruptsBuilder::build`,
//!   and any receiver obtained from `Interrupts::events`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
