//! # Signal sources and deferral.
//!
//! - [`Interrupts::listen_os_signals`] turns OS interrupts into [`Interrupts::raise`].
//! - [`Interrupts::defer_signals`] holds wakes back during a critical section.
//!
//! ## Signals
//! **Unix platforms:** `SIGINT` (Ctrl-C in terminal)
//!
//! **Other platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`]

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::hub::Interrupts;

/// Keeps incoming interrupts deferred while alive.
///
/// Guards nest. When the last one drops, at most one coalesced wake is delivered.
#[must_use = "signals are only deferred while the guard is alive"]
pub struct DeferGuard {
    hub: Arc<Interrupts>,
}

impl Drop for DeferGuard {
    fn drop(&mut self) {
        if self.hub.gate.leave() {
            self.hub.wake_bridge();
        }
    }
}

impl Interrupts {
    /// Defers [`raise`](Self::raise) until the returned guard (and every other one) is dropped.
    pub fn defer_signals(self: &Arc<Self>) -> DeferGuard {
        self.gate.enter();
        DeferGuard {
            hub: Arc::clone(self),
        }
    }

    /// True while at least one [`DeferGuard`] is alive.
    pub fn is_deferring(&self) -> bool {
        self.gate.is_deferring()
    }

    /// Spawns a listener that raises an interrupt for every OS interrupt signal.
    ///
    /// Runs until `token` is cancelled. Fails only if the signal handler cannot be installed.
    pub fn listen_os_signals(
        self: &Arc<Self>,
        token: CancellationToken,
    ) -> JoinHandle<std::io::Result<()>> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let mut source = OsInterrupts::install()?;
            loop {
                tokio::select! {
                    _ = token.cancelled() => return Ok(()),
                    received = source.next() => {
                        received?;
                        tracing::debug!("os interrupt received");
                        if !hub.raise() && !hub.is_deferring() {
                            tracing::warn!("interrupt received with no handler installed");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(unix)]
struct OsInterrupts {
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl OsInterrupts {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    async fn next(&mut self) -> std::io::Result<()> {
        match self.sigint.recv().await {
            Some(()) => Ok(()),
            None => Err(std::io::Error::other("signal stream closed")),
        }
    }
}

#[cfg(not(unix))]
struct OsInterrupts;

#[cfg(not(unix))]
impl OsInterrupts {
    fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn next(&mut self) -> std::io::Result<()> {
        tokio::signal::ctrl_c().await
    }
}
