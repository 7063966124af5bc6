use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::bots::HandlerContext;
use crate::error::BotError;

use super::chain::{Frame, Middleware, Next, RunContext};

/// Outermost stage: keeps the bot alive through handler failures.
///
/// Control errors pass through untouched so the runtime can act on
/// them. Everything else is logged and swallowed, turning the event
/// into a no-op instead of killing the listener loop.
pub struct CatchErrors;

#[async_trait]
impl Middleware for CatchErrors {
    async fn handle(
        &self,
        run: &RunContext,
        frame: Frame,
        next: Next<'_>,
    ) -> Result<Value, BotError> {
        match next.run(run, frame).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_control() => Err(err),
            Err(BotError::Invalid { message }) => {
                run.bot
                    .logger()
                    .critical(&format!(
                        "Fix the code. Critical invalid usage raised: {message}"
                    ))
                    .await;
                Ok(Value::Null)
            }
            Err(err) => {
                run.bot
                    .logger()
                    .exception("bot kept on working after unhandled error", &err)
                    .await;
                Ok(Value::Null)
            }
        }
    }
}

/// Stamps the payload with runtime context shared by all handlers.
pub struct LoadContext;

#[async_trait]
impl Middleware for LoadContext {
    async fn handle(
        &self,
        run: &RunContext,
        mut frame: Frame,
        next: Next<'_>,
    ) -> Result<Value, BotError> {
        frame.payload.insert("name", run.bot.name());
        next.run(run, frame).await
    }
}

/// Extracts `sender` and `message` from the payload and attaches the
/// reply surface.
///
/// The untouched message text is preserved under `raw_message`; the
/// routing stage later overwrites `message` with the command arguments.
pub struct BuildChat;

#[async_trait]
impl Middleware for BuildChat {
    async fn handle(
        &self,
        run: &RunContext,
        mut frame: Frame,
        next: Next<'_>,
    ) -> Result<Value, BotError> {
        let message = frame
            .payload
            .str("message")
            .map(str::to_string)
            .ok_or_else(|| BotError::invalid("chat event carries no string 'message'"))?;
        let sender = match frame.payload.get("sender") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(BotError::invalid(format!(
                    "chat event 'sender' must be a string or number, got {other}"
                )));
            }
            None => return Err(BotError::invalid("chat event carries no 'sender'")),
        };

        frame.payload.insert("raw_message", message.clone());
        frame.chat = Some(
            run.bot
                .make_chat(sender, message)
                .ok_or_else(|| BotError::invalid("chat stage on a bot without a sender"))?,
        );
        next.run(run, frame).await
    }
}

/// Resolves the message to a command binding via the bot's router.
///
/// No match answers with the unknown-command text; a match the user
/// may not run answers with the refusal text. Both short-circuit the
/// pipeline. On success the arguments land in the payload under
/// `arguments`, `args` and `message`, and the matched binding rides
/// the frame to the invoke stage.
pub struct RouteCommand;

#[async_trait]
impl Middleware for RouteCommand {
    async fn handle(
        &self,
        run: &RunContext,
        mut frame: Frame,
        next: Next<'_>,
    ) -> Result<Value, BotError> {
        let chat = frame
            .chat
            .clone()
            .ok_or_else(|| BotError::invalid("routing stage before the chat stage"))?;
        let router = run
            .bot
            .router()
            .ok_or_else(|| BotError::invalid("routing stage on a bot without commands"))?;

        let (command, args) = match router.find_best_match(&chat.message) {
            Some(found) => found,
            None => return chat.unknown_command().await,
        };
        if !command.is_user_allowed(&chat.sender) {
            return chat.refuse().await;
        }

        frame.payload.insert("arguments", args.clone());
        frame.payload.insert("args", args.clone());
        frame.payload.insert("message", args);
        frame.payload.insert("command", command.command());
        frame.command = Some(Arc::from(command.command()));
        frame.handler = Some(command.handler().clone());
        next.run(run, frame).await
    }
}

/// Terminal stage: resolves arguments and calls the handler.
///
/// Prefers the handler routing picked; falls back to the bot's own
/// handler for bots that process raw events.
pub struct Invoke;

#[async_trait]
impl Middleware for Invoke {
    async fn handle(
        &self,
        run: &RunContext,
        frame: Frame,
        _next: Next<'_>,
    ) -> Result<Value, BotError> {
        let Frame {
            payload,
            chat,
            handler,
            command,
        } = frame;

        let handler = handler
            .or_else(|| run.bot.handler().cloned())
            .ok_or_else(|| BotError::invalid("no handler selected for this event"))?;
        let args = run.bot.providers().resolve(handler.params(), &payload)?;
        let ctx = HandlerContext {
            bot: run.bot.name_arc(),
            logger: run.bot.logger().clone(),
            registry: Arc::clone(&run.registry),
            chat,
            command,
        };
        handler.call(ctx, args).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::bots::{Bot, HandlerFn, StubListener};
    use crate::chat::Command;
    use crate::payload::Payload;
    use crate::runtime::BotRegistry;

    type Outbox = Arc<Mutex<Vec<(String, String)>>>;

    fn chat_bot(outbox: Outbox, commands: Vec<Command>) -> Arc<Bot> {
        let mut builder = Bot::builder("pipeline")
            .with_listener(Arc::new(StubListener))
            .with_sender(move |message, user| {
                let outbox = Arc::clone(&outbox);
                async move {
                    outbox.lock().unwrap().push((user, message));
                    Ok(Value::Null)
                }
            });
        for command in commands {
            builder = builder.with_command(command);
        }
        Arc::new(builder.build().unwrap())
    }

    fn run_context(bot: &Arc<Bot>) -> RunContext {
        RunContext {
            bot: Arc::clone(bot),
            registry: Arc::new(BotRegistry::new(vec![bot.name().to_string()])),
        }
    }

    fn chat_event(sender: &str, message: &str) -> Payload {
        Payload::new().with("sender", sender).with("message", message)
    }

    #[tokio::test]
    async fn routed_command_receives_arguments() {
        let outbox: Outbox = Arc::default();
        let echo = HandlerFn::arc(&["args"], |ctx: HandlerContext, args: Payload| async move {
            let text = args.str("args").unwrap_or_default().to_string();
            if let Some(chat) = ctx.chat.as_ref() {
                chat.reply(&text).await?;
            }
            Ok(Value::Null)
        });
        let bot = chat_bot(outbox.clone(), vec![Command::new("echo", echo)]);
        let run = run_context(&bot);

        bot.chain()
            .run(&run, chat_event("alice", "Echo hello world"))
            .await
            .unwrap();

        let sent = outbox.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice");
        assert_eq!(sent[0].1, "hello world");
    }

    #[tokio::test]
    async fn unmatched_message_gets_unknown_reply() {
        let outbox: Outbox = Arc::default();
        let bot = chat_bot(
            outbox.clone(),
            vec![Command::new("echo", HandlerFn::arc(&[], |_, _| async {
                Ok(Value::Null)
            }))],
        );
        let run = run_context(&bot);

        bot.chain()
            .run(&run, chat_event("alice", "unrelated"))
            .await
            .unwrap();

        let sent = outbox.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "Unknown command");
    }

    #[tokio::test]
    async fn denied_user_gets_refusal() {
        let outbox: Outbox = Arc::default();
        let bot = chat_bot(
            outbox.clone(),
            vec![Command::new("wipe", HandlerFn::arc(&[], |_, _| async {
                Ok(Value::Null)
            }))
            .deny(["mallory"])],
        );
        let run = run_context(&bot);

        bot.chain()
            .run(&run, chat_event("Mallory", "wipe"))
            .await
            .unwrap();

        let sent = outbox.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "Access forbidden");
    }

    #[tokio::test]
    async fn numeric_sender_is_accepted() {
        let outbox: Outbox = Arc::default();
        let bot = chat_bot(
            outbox.clone(),
            vec![Command::new("", HandlerFn::arc(&[], |ctx: HandlerContext, _| async move {
                if let Some(chat) = ctx.chat.as_ref() {
                    chat.reply("ok").await?;
                }
                Ok(Value::Null)
            }))],
        );
        let run = run_context(&bot);

        bot.chain()
            .run(&run, Payload::new().with("sender", 42).with("message", "hi"))
            .await
            .unwrap();

        let sent = outbox.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "42");
        assert_eq!(sent[0].1, "ok");
    }

    #[tokio::test]
    async fn handler_failure_is_swallowed_by_catch_stage() {
        let outbox: Outbox = Arc::default();
        let bot = chat_bot(
            outbox.clone(),
            vec![Command::new("boom", HandlerFn::arc(&[], |_, _| async {
                Err(BotError::failed("kaboom"))
            }))],
        );
        let run = run_context(&bot);

        let value = bot
            .chain()
            .run(&run, chat_event("alice", "boom"))
            .await
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn control_errors_pass_through_catch_stage() {
        let outbox: Outbox = Arc::default();
        let bot = chat_bot(
            outbox.clone(),
            vec![Command::new("quit", HandlerFn::arc(&[], |_, _| async {
                Err(BotError::exit_bot("asked to quit"))
            }))],
        );
        let run = run_context(&bot);

        let err = bot
            .chain()
            .run(&run, chat_event("alice", "quit"))
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::ExitBot { .. }));
    }

    #[tokio::test]
    async fn plain_bot_uses_fixed_handler_without_chat() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let handler = HandlerFn::arc(&["raw"], move |ctx: HandlerContext, args: Payload| {
            let sink = Arc::clone(&sink);
            async move {
                assert!(ctx.chat.is_none());
                sink.lock()
                    .unwrap()
                    .push(args.str("raw").unwrap_or_default().to_string());
                Ok(Value::Null)
            }
        });
        let bot = Arc::new(
            Bot::builder("plain")
                .with_listener(crate::bots::ListenerFn::arc(
                    "idle",
                    |_, ctx: tokio_util::sync::CancellationToken| async move {
                        ctx.cancelled().await;
                        Err(BotError::Cancelled)
                    },
                ))
                .with_handler(handler)
                .with_provider("raw", &["message"], |deps| {
                    Ok(Value::from(deps.str("message").unwrap_or_default()))
                })
                .build()
                .unwrap(),
        );
        let run = run_context(&bot);

        bot.chain()
            .run(&run, Payload::new().with("message", "ding"))
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), ["ding"]);
    }
}
