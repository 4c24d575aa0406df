//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`] fan-out
//! used to observe events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//!   raise / dispatcher / supervisor ── publish(Event) ──► Bus
//!                                                          │
//!                                   subscriber listener ◄──┘
//!                                          │
//!                                   SubscriberSet::emit
//!                                     ├──► LogWriter (feature "logging")
//!                                     └──► custom subscribers
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
