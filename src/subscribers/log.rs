//! # LogWriter: renders runtime events through `tracing`.
//!
//! A subscriber that turns each [`Event`] into one structured `tracing` record.
//! Install a `tracing` subscriber (for example `tracing_subscriber::fmt`) to see output.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO intervisor: interrupt raised
//! INFO intervisor: interrupt received task=task#3 generation=1
//! WARN intervisor: escalated to forced interrupt task=task#3
//! INFO intervisor: broadcast count=2
//! ERROR intervisor: dispatcher crashed task=task#3 generation=1 reason="task interrupted: interrupt signal"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.map(|t| t.to_string());
        let scope = e.scope.as_ref().map(|s| s.as_str());
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::InterruptRaised => {
                tracing::info!(target: "intervisor", ?reason, "interrupt raised");
            }
            EventKind::InterruptDeferred => {
                tracing::debug!(target: "intervisor", "interrupt deferred");
            }
            EventKind::InterruptReceived => {
                tracing::info!(target: "intervisor", ?task, generation = ?e.generation, "interrupt received");
            }
            EventKind::Escalated => {
                tracing::warn!(target: "intervisor", ?task, "escalated to forced interrupt");
            }
            EventKind::ForceDelivered => {
                tracing::warn!(target: "intervisor", ?task, "forced interrupt delivered");
            }
            EventKind::ForceSkipped => {
                tracing::debug!(target: "intervisor", ?task, ?reason, "forced interrupt skipped");
            }
            EventKind::Broadcast => {
                tracing::info!(target: "intervisor", count = ?e.count, "broadcast");
            }
            EventKind::ScopeInterrupted => {
                tracing::info!(target: "intervisor", ?scope, count = ?e.count, "scope interrupted");
            }
            EventKind::HandlerRegistered => {
                tracing::debug!(target: "intervisor", ?task, ?scope, "handler registered");
            }
            EventKind::HandlerUnregistered => {
                tracing::debug!(target: "intervisor", ?task, ?scope, "handler unregistered");
            }
            EventKind::BridgeInstalled => {
                tracing::debug!(target: "intervisor", generation = ?e.generation, "bridge installed");
            }
            EventKind::BridgeUninstalled => {
                tracing::debug!(target: "intervisor", generation = ?e.generation, "bridge uninstalled");
            }
            EventKind::DispatcherStarted => {
                tracing::info!(
                    target: "intervisor",
                    ?task,
                    handler = ?e.handler,
                    generation = ?e.generation,
                    attempt = ?e.attempt,
                    "dispatcher started"
                );
            }
            EventKind::DispatcherStopped => {
                tracing::info!(target: "intervisor", ?task, generation = ?e.generation, "dispatcher stopped");
            }
            EventKind::DispatcherCrashed => {
                tracing::error!(
                    target: "intervisor",
                    ?task,
                    generation = ?e.generation,
                    ?reason,
                    "dispatcher crashed"
                );
            }
            EventKind::DispatcherRestarted => {
                tracing::warn!(
                    target: "intervisor",
                    ?task,
                    generation = ?e.generation,
                    attempt = ?e.attempt,
                    "dispatcher restarted"
                );
            }
            EventKind::MenuSelected => {
                tracing::info!(target: "intervisor", ?reason, ?scope, "menu selection");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "intervisor", ?reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "intervisor", ?reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
