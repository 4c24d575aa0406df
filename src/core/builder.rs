use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_util::sync::CancellationToken;

use super::hub::Interrupts;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::events::Bus;
use crate::menu::{Menu, PromptMenu};
use crate::process::{ProcessControl, StdProcess};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for an [`Interrupts`] context.
///
/// Defaults: [`SystemClock`], [`PromptMenu`], [`StdProcess`], no subscribers.
pub struct InterruptsBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    clock: Arc<dyn Clock>,
    menu: Option<Arc<dyn Menu>>,
    process: Arc<dyn ProcessControl>,
}

impl InterruptsBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            clock: Arc::new(SystemClock),
            menu: None,
            process: Arc::new(StdProcess),
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive runtime events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the wall clock used by the escalation debounce.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the operator menu of the interactive dispatcher.
    pub fn with_menu(mut self, menu: Arc<dyn Menu>) -> Self {
        self.menu = Some(menu);
        self
    }

    /// Replaces the exit/abort primitives of the interactive dispatcher.
    pub fn with_process(mut self, process: Arc<dyn ProcessControl>) -> Self {
        self.process = process;
        self
    }

    /// Builds the context.
    ///
    /// With subscribers configured this must run inside a tokio runtime: it spawns
    /// one worker per subscriber plus the bus listener feeding them. The listener
    /// runs until [`Interrupts::shutdown`] or until the context is dropped.
    pub fn build(self) -> Arc<Interrupts> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let menu = self
            .menu
            .unwrap_or_else(|| Arc::new(PromptMenu::new()) as Arc<dyn Menu>);
        let listener = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            subscriber_listener(&bus, subs, listener.clone());
        }

        Arc::new(Interrupts::new_internal(
            self.cfg,
            bus,
            self.clock,
            menu,
            self.process,
            listener,
        ))
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled.
///
/// The set publishes overflow and panic events through its own bus clone, so the
/// bus never reports `Closed` while the set is alive.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                received = rx.recv() => match received {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged behind the event bus");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        // Deliver what was published before the stop.
        loop {
            match rx.try_recv() {
                Ok(ev) => set.emit(&ev),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        set.shutdown().await;
    });
}

impl Interrupts {
    /// Starts building a context with `cfg`.
    pub fn builder(cfg: Config) -> InterruptsBuilder {
        InterruptsBuilder::new(cfg)
    }
}
