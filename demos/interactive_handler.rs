//! # Example: Interactive handler
//!
//! Each Ctrl-C opens a menu on stderr: interrupt everything, pick one scope,
//! force the root task, ignore, stop the handler, or exit/abort the process.
//!
//! ## Run
//! ```bash
//! cargo run --example interactive_handler
//! ```

use tokio_util::sync::CancellationToken;

use intervisor::{Config, InterruptError, Interrupts, TaskCtx};

async fn watcher(ctx: TaskCtx, scope: &'static str) -> Result<(), InterruptError> {
    ctx.register(scope)?;
    loop {
        ctx.wait_for_signal().await?;
        println!("[{scope}] interrupted");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let hub = Interrupts::builder(Config {
        exit_code: 130,
        ..Config::default()
    })
    .build();

    for scope in ["compiler", "downloads", "repl"] {
        let _ = hub.spawn(scope, move |ctx| watcher(ctx, scope));
    }

    let token = CancellationToken::new();
    let listener = hub.listen_os_signals(token.clone());

    let Some(dispatcher) = hub.start_interactive_handler(false) else {
        anyhow::bail!("a handler is already running");
    };
    println!("press Ctrl-C to open the menu; choose \"Stop this handler\" to quit");

    dispatcher.join().await??;
    token.cancel();
    listener.await??;
    hub.shutdown();
    Ok(())
}
