//! # Example: Simple handler
//!
//! Two workers register under different scopes; every Ctrl-C wakes both.
//! Press Ctrl-C twice within a second to force-interrupt the root task.
//!
//! ## Run
//! ```bash
//! cargo run --example simple_handler
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use intervisor::{Config, InterruptError, Interrupts, TaskCtx};

async fn worker(ctx: TaskCtx, scope: &'static str) -> Result<(), InterruptError> {
    ctx.register(scope)?;
    for round in 1..=3 {
        ctx.wait_for_signal().await?;
        println!("[{scope}] interrupted ({round}/3), cancelling in-flight work");
    }
    ctx.unregister(scope)?;
    println!("[{scope}] done");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let hub = Interrupts::builder(Config::default()).build();

    let root = hub.spawn("root", |ctx| async move {
        loop {
            match ctx.suspend(tokio::time::sleep(Duration::from_secs(1))).await {
                Ok(()) => println!("[root] tick"),
                Err(err) => println!("[root] {err}, unwinding current step"),
            }
        }
    });
    hub.set_root_task(root.id());

    let net = hub.spawn("net", |ctx| worker(ctx, "net"));
    let disk = hub.spawn("disk", |ctx| worker(ctx, "disk"));

    hub.start_simple_handler(false);
    let token = CancellationToken::new();
    let listener = hub.listen_os_signals(token.clone());
    println!("press Ctrl-C (three times to finish)");

    net.join().await??;
    disk.join().await??;

    token.cancel();
    listener.await??;
    root.abort();
    hub.shutdown();
    Ok(())
}
