//! # Example: admin_control
//!
//! Operating one bot from another: start, stop, and status over chat.
//!
//! Demonstrates how to:
//! - Keep a bot registered but idle with `with_run_at_start(false)`.
//! - Start it from a handler by returning the [`BotRegistry::start`] signal.
//! - Stop it with [`BotRegistry::stop`] and watch its listener get cancelled.
//! - Shut the whole application down with [`BotError::exit_application`].
//!
//! ## Flow
//! ```text
//! "start worker" ──► handler ──► registry.start("worker") ──► Err(StartBot)
//!     └─► Supervisor: relaunch the raiser, spawn the target bot
//!
//! "stop worker"  ──► handler ──► registry.stop("worker") ──► token cancel
//!     └─► worker actor exits Cancelled, Supervisor retires it
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example admin_control
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use botvisor::{
    Bot, BotApp, BotError, Command, EventSink, HandlerContext, HandlerFn, ListenerFn, Payload,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const SCRIPT: &[&str] = &["status", "start worker", "status", "stop worker", "quit"];

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. The managed bot: idle until started, prints while it runs.
    let worker_listener = ListenerFn::arc(
        "crunch",
        |_events: EventSink, ctx: CancellationToken| async move {
            println!("[worker] up");
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        println!("[worker] stopped");
                        return Err(BotError::Cancelled);
                    }
                    _ = tokio::time::sleep(Duration::from_millis(200)) => {
                        println!("[worker] crunching");
                    }
                }
            }
        },
    );
    let worker = Bot::builder("worker")
        .with_listener(worker_listener)
        .with_handler(HandlerFn::arc(&[], |_ctx, _args| async { Ok(Value::Null) }))
        .with_run_at_start(false)
        .build()?;

    // 2. A scripted operator console. The step counter lives outside the
    //    listener: raising StartBot relaunches the listener, and the fresh
    //    one must pick the script up where the old one left off.
    let step = Arc::new(AtomicUsize::new(0));
    let feed_step = step.clone();
    let ops_feed = ListenerFn::arc(
        "ops-feed",
        move |events: EventSink, ctx: CancellationToken| {
            let step = feed_step.clone();
            async move {
                loop {
                    let line = match SCRIPT.get(step.fetch_add(1, Ordering::SeqCst)) {
                        Some(line) => *line,
                        None => break,
                    };
                    println!("[ops] <- operator: {line}");
                    let payload = Payload::new()
                        .with("sender", "operator")
                        .with("message", line);
                    events.send(payload).await?;
                    tokio::time::sleep(Duration::from_millis(400)).await;
                }
                ctx.cancelled().await;
                Err(BotError::Cancelled)
            }
        },
    );

    // 3. Admin command handlers built on the registry handle.
    let status = HandlerFn::arc(&[], |ctx: HandlerContext, _args| async move {
        let running = ctx.registry.running().await;
        let stopped = ctx.registry.stopped().await;
        match &ctx.chat {
            Some(chat) => {
                chat.reply(&format!("running: {running:?}, stopped: {stopped:?}"))
                    .await
            }
            None => Err(BotError::invalid("status needs a chat")),
        }
    });
    let start = HandlerFn::arc(&["arguments"], |ctx: HandlerContext, args: Payload| async move {
        let target = args.str("arguments").unwrap_or_default().to_string();
        match ctx.registry.start(&target).await {
            Ok(signal) => Err(signal),
            Err(refusal) => match &ctx.chat {
                Some(chat) => chat.reply(&format!("cannot start '{target}': {refusal}")).await,
                None => Err(BotError::invalid("start needs a chat")),
            },
        }
    });
    let stop = HandlerFn::arc(&["arguments"], |ctx: HandlerContext, args: Payload| async move {
        let target = args.str("arguments").unwrap_or_default().to_string();
        let accepted = ctx.registry.stop(&target).await;
        match &ctx.chat {
            Some(chat) => chat.reply(&format!("stop '{target}': {accepted}")).await,
            None => Err(BotError::invalid("stop needs a chat")),
        }
    });
    let quit = HandlerFn::arc(&[], |_ctx, _args| async {
        Err(BotError::exit_application("operator closed the application"))
    });

    let ops = Bot::builder("ops")
        .with_listener(ops_feed)
        .with_command(Command::new("status", status))
        .with_command(Command::new("start", start).admin_only())
        .with_command(Command::new("stop", stop).admin_only())
        .with_command(Command::new("quit", quit).admin_only())
        .with_admin("operator")
        .with_sender(|message: String, user: String| async move {
            println!("[ops] -> {user}: {message}");
            Ok(Value::Null)
        })
        .build()?;

    BotApp::new().add_bot(worker)?.add_bot(ops)?.run().await?;
    println!("[ops] application closed");
    Ok(())
}
