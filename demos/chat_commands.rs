//! # Example: chat_commands
//!
//! A chat bot with trie-routed commands, access lists, and canned replies.
//!
//! Demonstrates how to:
//! - Declare commands with [`Command`] and route them by longest prefix.
//! - Restrict a command to the admin with [`Command::admin_only`].
//! - Wire a sender so the bot can answer (here it prints to stdout).
//!
//! The listener plays a scripted conversation; swap it for a real chat
//! connection and nothing else changes.
//!
//! ## Flow
//! ```text
//! payload {sender, message}
//!     ├─► BuildChat     (attach the Chat capability)
//!     ├─► RouteCommand  (trie walk, casefolded, longest match)
//!     │      ├─ no match        ─► "Unknown command" reply
//!     │      ├─ user not allowed ─► "Access forbidden" reply
//!     │      └─ match           ─► arguments extracted
//!     └─► Invoke        (handler call with resolved params)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example chat_commands
//! ```

use botvisor::{
    Bot, BotApp, BotError, Command, EventSink, HandlerContext, HandlerFn, ListenerFn, Payload,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. A scripted conversation standing in for a chat connection.
    let script: &[(&str, &str)] = &[
        ("alice", "ping"),
        ("alice", "Echo botvisor is up"),
        ("alice", "help"),
        ("mallory", "shutdown now"),
        ("alice", "shutdown now"),
    ];
    let lines: Vec<(String, String)> = script
        .iter()
        .map(|(s, m)| (s.to_string(), m.to_string()))
        .collect();

    let chat_feed = ListenerFn::arc(
        "chat-feed",
        move |events: EventSink, ctx: CancellationToken| {
            let lines = lines.clone();
            async move {
                for (sender, message) in lines {
                    println!("[chat] <- {sender}: {message}");
                    let payload = Payload::new()
                        .with("sender", sender)
                        .with("message", message);
                    events.send(payload).await?;
                }
                ctx.cancelled().await;
                Err(BotError::Cancelled)
            }
        },
    );

    // 2. Command handlers. Routed commands receive the extracted tail in
    //    the "arguments" key.
    let ping = HandlerFn::arc(&[], |ctx: HandlerContext, _args| async move {
        match &ctx.chat {
            Some(chat) => chat.reply("pong").await,
            None => Err(BotError::invalid("ping needs a chat")),
        }
    });
    let echo = HandlerFn::arc(&["arguments"], |ctx: HandlerContext, args: Payload| async move {
        let text = args.str("arguments").unwrap_or_default().to_string();
        match &ctx.chat {
            Some(chat) => chat.reply(&text).await,
            None => Err(BotError::invalid("echo needs a chat")),
        }
    });
    let shutdown = HandlerFn::arc(&[], |_ctx, _args| async {
        Err(BotError::exit_application("operator asked to stop"))
    });

    // 3. The bot: commands, an admin, and a sender that prints replies.
    let bot = Bot::builder("concierge")
        .with_listener(chat_feed)
        .with_command(Command::new("ping", ping))
        .with_command(Command::new("echo", echo))
        .with_command(Command::new("shutdown", shutdown).admin_only())
        .with_admin("alice")
        .with_sender(|message: String, user: String| async move {
            println!("[chat] -> {user}: {message}");
            Ok(Value::Null)
        })
        .build()?;

    BotApp::new().add_bot(bot)?.run().await?;
    println!("[chat] conversation over");
    Ok(())
}
