//! # Example: hello
//!
//! Minimal example of a single bot fed by an in-process listener.
//!
//! Demonstrates how to:
//! - Define a listener with [`ListenerFn`] that pushes payloads into the runtime.
//! - Define a fixed handler with [`HandlerFn`] (plain bots route every payload to it).
//! - Assemble and run the application with [`BotApp`].
//!
//! ## Flow
//! ```text
//! Bot ──► BotApp::run()
//!     ├─► Supervisor spawns the bot actor (plus the task scheduler)
//!     ├─► listener sends "hello" payloads into the bot's channel
//!     ├─► pipeline: CatchErrors ─► LoadContext ─► Invoke ─► handler
//!     └─► handler raises ExitApplication ─► graceful shutdown
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example hello
//! ```

use botvisor::{Bot, BotApp, BotError, EventSink, HandlerFn, ListenerFn, Payload};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 1. A listener that emits three payloads, then waits for shutdown.
    let feed = ListenerFn::arc(
        "feed",
        |events: EventSink, ctx: CancellationToken| async move {
            for i in 1..=3 {
                let payload = Payload::new()
                    .with("message", format!("hello #{i}"))
                    .with("last", i == 3);
                events.send(payload).await?;
            }
            ctx.cancelled().await;
            Err(BotError::Cancelled)
        },
    );

    // 2. A fixed handler; its params are resolved from each payload.
    let greet = HandlerFn::arc(&["message", "last"], |_ctx, args: Payload| async move {
        println!("[hello] got: {}", args.str("message").unwrap_or_default());
        if args.get("last").and_then(Value::as_bool) == Some(true) {
            return Err(BotError::exit_application("all greetings delivered"));
        }
        Ok(Value::Null)
    });

    // 3. Build the bot and run the application until the handler stops it.
    let bot = Bot::builder("hello")
        .with_listener(feed)
        .with_handler(greet)
        .build()?;

    match BotApp::new().add_bot(bot)?.run().await {
        Ok(()) => println!("[hello] runtime stopped gracefully"),
        Err(e) => println!("[hello] runtime stopped with error: {e}"),
    }
    Ok(())
}
