//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for observing what the interrupt core does.
//! Each subscriber is driven by a dedicated worker loop fed by a bounded queue
//! owned by the [`SubscriberSet`](crate::subscribers::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching); they do **not** block the
//!   dispatcher, the bridge, or other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. On overflow the event is dropped for that
//!   subscriber and `SubscriberOverflow` is published.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use intervisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct EscalationCounter(AtomicUsize);
//!
//! #[async_trait::async_trait]
//! impl Subscribe for EscalationCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::Escalated {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "escalation-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs and overflow events).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
