use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::bots::{Bot, EventSink};
use crate::config::Config;
use crate::error::BotError;
use crate::middleware::RunContext;

use super::monitor::ErrorRateMonitor;
use super::registry::BotRegistry;

/// Drives one bot: listener lifecycle, event pumping, error throttling.
///
/// The actor owns the listener⇄pipeline loop of a single bot
/// execution. It spawns the listener on its own task, pulls payloads
/// off the bounded queue one at a time, and feeds them through the
/// bot's chain. Failures restart the listener under the throttle
/// policy; control errors travel up to the runtime untouched.
pub(crate) struct BotActor {
    bot: Arc<Bot>,
    registry: Arc<BotRegistry>,
    config: Config,
}

impl BotActor {
    pub(crate) fn new(bot: Arc<Bot>, registry: Arc<BotRegistry>, config: Config) -> Self {
        Self {
            bot,
            registry,
            config,
        }
    }

    /// Runs the bot until it finishes, fails fatally or is cancelled.
    pub(crate) async fn run(self, ctx: CancellationToken) -> Result<(), BotError> {
        let throttle = self.config.throttle;
        let mut monitor = ErrorRateMonitor::new(throttle.cooldown);
        let run = RunContext {
            bot: Arc::clone(&self.bot),
            registry: Arc::clone(&self.registry),
        };

        loop {
            match self.run_listener(&run, &ctx).await {
                Ok(()) => return Ok(()),
                Err(BotError::RestartListening) => continue,
                Err(err) if err.is_control() => return Err(err),
                Err(err) => {
                    self.bot
                        .logger()
                        .exception("bot kept listening after unhandled error", &err)
                        .await;
                    if monitor.since_start() < throttle.startup_grace {
                        return Err(BotError::exit_bot(format!(
                            "bot '{}' failed immediately after start",
                            self.bot.name()
                        )));
                    }
                    let rate = monitor.evoke();
                    if rate > throttle.max_rate {
                        self.bot
                            .logger()
                            .error(&format!(
                                "error rate too high, bot sleeps for {:?}",
                                throttle.pause
                            ))
                            .await;
                        tokio::select! {
                            _ = ctx.cancelled() => return Err(BotError::Cancelled),
                            _ = tokio::time::sleep(throttle.pause) => {}
                        }
                        monitor.set_count(throttle.resume_count);
                    }
                }
            }
        }
    }

    /// One listener instance: spawn it, pump its events, reap its exit.
    async fn run_listener(
        &self,
        run: &RunContext,
        ctx: &CancellationToken,
    ) -> Result<(), BotError> {
        let (sink, mut rx) = EventSink::channel(self.config.queue_capacity_clamped());
        let child = ctx.child_token();
        let listener = Arc::clone(self.bot.listener());
        let mut listener_task = tokio::spawn({
            let child = child.clone();
            async move { listener.run(sink, child).await }
        });

        let verdict = loop {
            tokio::select! {
                _ = ctx.cancelled() => break Err(BotError::Cancelled),
                event = rx.recv() => match event {
                    Some(payload) => {
                        if let Err(err) = run.bot.chain().run(run, payload).await {
                            break Err(err);
                        }
                    }
                    // Queue drained and the sink is gone: the listener
                    // finished. Its result is the verdict.
                    None => {
                        break match (&mut listener_task).await {
                            Ok(result) => result,
                            Err(join_err) => Err(BotError::failed(format!(
                                "listener panicked: {join_err}"
                            ))),
                        };
                    }
                },
            }
        };
        child.cancel();
        listener_task.abort();
        verdict
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use serde_json::Value;

    use super::*;
    use crate::bots::{HandlerFn, ListenerFn};
    use crate::payload::Payload;

    fn actor_for(bot: Bot) -> (BotActor, Arc<BotRegistry>) {
        let registry = Arc::new(BotRegistry::new(vec![bot.name().to_string()]));
        let actor = BotActor::new(Arc::new(bot), Arc::clone(&registry), Config::default());
        (actor, registry)
    }

    #[tokio::test]
    async fn finished_listener_ends_the_bot() {
        let bot = Bot::builder("done")
            .with_listener(ListenerFn::arc("oneshot", |_events, _ctx| async { Ok(()) }))
            .with_handler(HandlerFn::arc(&[], |_, _| async { Ok(Value::Null) }))
            .build()
            .unwrap();
        let (actor, _) = actor_for(bot);

        let verdict = actor.run(CancellationToken::new()).await;
        assert!(verdict.is_ok());
    }

    #[tokio::test]
    async fn cancellation_stops_the_pump() {
        let bot = Bot::builder("idle")
            .with_listener(ListenerFn::arc("idle", |_events, ctx: CancellationToken| async move {
                ctx.cancelled().await;
                Err(BotError::Cancelled)
            }))
            .with_handler(HandlerFn::arc(&[], |_, _| async { Ok(Value::Null) }))
            .build()
            .unwrap();
        let (actor, _) = actor_for(bot);

        let ctx = CancellationToken::new();
        let handle = tokio::spawn(actor.run(ctx.clone()));
        tokio::task::yield_now().await;
        ctx.cancel();
        let verdict = handle.await.unwrap();
        assert!(matches!(verdict, Err(BotError::Cancelled)));
    }

    #[tokio::test]
    async fn restart_signal_spawns_a_fresh_listener() {
        let starts = Arc::new(AtomicU32::new(0));
        let listener = {
            let starts = Arc::clone(&starts);
            ListenerFn::arc("counting", move |events: EventSink, ctx: CancellationToken| {
                let attempt = starts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    events
                        .send(Payload::new().with("message", "go").with("attempt", attempt))
                        .await?;
                    ctx.cancelled().await;
                    Err(BotError::Cancelled)
                }
            })
        };
        let handler = HandlerFn::arc(&["attempt"], |_ctx, args: Payload| async move {
            match args.get_as::<u32>("attempt")? {
                1 => Err(BotError::RestartListening),
                _ => Err(BotError::exit_bot("second attempt, enough")),
            }
        });
        let bot = Bot::builder("restarting")
            .with_listener(listener)
            .with_handler(handler)
            .build()
            .unwrap();
        let (actor, _) = actor_for(bot);

        let verdict = actor.run(CancellationToken::new()).await;
        assert!(matches!(verdict, Err(BotError::ExitBot { .. })));
        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_right_after_start_exits_the_bot() {
        let bot = Bot::builder("crasher")
            .with_listener(ListenerFn::arc("crashing", |_events, _ctx| async {
                Err(BotError::failed("connection refused"))
            }))
            .with_handler(HandlerFn::arc(&[], |_, _| async { Ok(Value::Null) }))
            .build()
            .unwrap();
        let (actor, _) = actor_for(bot);

        let verdict = actor.run(CancellationToken::new()).await;
        match verdict {
            Err(BotError::ExitBot { reason }) => {
                assert!(reason.contains("failed immediately after start"));
            }
            other => panic!("expected ExitBot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn listener_panic_is_contained() {
        let bot = Bot::builder("panicky")
            .with_listener(ListenerFn::arc("panicking", |_events, _ctx| async {
                panic!("listener blew up")
            }))
            .with_handler(HandlerFn::arc(&[], |_, _| async { Ok(Value::Null) }))
            .build()
            .unwrap();
        let (actor, _) = actor_for(bot);

        // A panic right after start takes the same fatal-exit path as a
        // startup failure.
        let verdict = actor.run(CancellationToken::new()).await;
        assert!(matches!(verdict, Err(BotError::ExitBot { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn high_error_rate_pauses_the_bot() {
        let starts = Arc::new(AtomicU32::new(0));
        let listener = {
            let starts = Arc::clone(&starts);
            ListenerFn::arc("flaky", move |_events: EventSink, _ctx: CancellationToken| {
                starts.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Err(BotError::failed("flaky transport"))
                }
            })
        };
        let bot = Bot::builder("flaky")
            .with_listener(listener)
            .with_handler(HandlerFn::arc(&[], |_, _| async { Ok(Value::Null) }))
            .build()
            .unwrap();
        let (actor, _) = actor_for(bot);

        let ctx = CancellationToken::new();
        let handle = tokio::spawn(actor.run(ctx.clone()));

        // Six failures, five seconds apart, trip the default max rate
        // of 5 per minute; the pump must be pausing, not respawning.
        tokio::time::sleep(Duration::from_secs(32)).await;
        assert_eq!(starts.load(Ordering::SeqCst), 6);

        ctx.cancel();
        let verdict = handle.await.unwrap();
        assert!(matches!(verdict, Err(BotError::Cancelled)));
    }
}
