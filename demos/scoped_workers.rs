//! # Example: Scoped workers with event logging
//!
//! Drives the core without a terminal: interrupts are raised programmatically,
//! a worker is forcibly interrupted through escalation, and the dispatcher is
//! crashed once to show the automatic restart. Events are rendered by
//! [`LogWriter`](intervisor::LogWriter) through `tracing`.
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example scoped_workers --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use intervisor::{Config, InterruptError, Interrupts, LogWriter, Subscribe, TaskCtx};

async fn worker(ctx: TaskCtx, scope: &'static str) -> Result<(), InterruptError> {
    ctx.register(scope)?;
    loop {
        ctx.wait_for_signal().await?;
        tracing::info!(scope, "worker observed interrupt");
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let hub = Interrupts::builder(Config::default())
        .with_subscribers(subs)
        .build();

    let root = hub.spawn("root", |ctx| async move {
        while ctx.suspend(tokio::time::sleep(Duration::from_secs(60))).await.is_ok() {}
        tracing::warn!("root task unwound by forced interrupt");
    });
    hub.set_root_task(root.id());

    let workers: Vec<_> = ["db", "http"]
        .into_iter()
        .map(|scope| hub.spawn(scope, move |ctx| worker(ctx, scope)))
        .collect();

    hub.start_simple_handler(false);
    settle().await;

    // One interrupt: broadcast only.
    hub.raise();
    settle().await;

    // A second one right away: broadcast plus forced interrupt of the root task.
    hub.raise();
    settle().await;
    root.join().await?;

    // Crash the dispatcher; the supervisor restarts it.
    hub.force_interrupt_handler();
    settle().await;
    tracing::info!(running = hub.is_running(), "after dispatcher crash");

    hub.raise();
    settle().await;

    for w in workers {
        w.abort();
    }
    hub.shutdown();
    settle().await;
    Ok(())
}
