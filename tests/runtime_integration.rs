//! Integration tests for the supervised runtime.
//!
//! Everything here goes through the public API: bots are built with
//! `BotBuilder`, assembled with `BotApp`, and driven end to end through
//! real listeners and handlers.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use botvisor::{
    Bot, BotApp, BotError, Command, EventSink, HandlerContext, HandlerFn, HandlerRef, ListenerFn,
    Payload, RuntimeError, StubListener, TaskInfo,
};

fn noop_handler() -> HandlerRef {
    HandlerFn::arc(&[], |_ctx, _args| async { Ok(Value::Null) })
}

#[tokio::test]
async fn exit_application_from_handler_shuts_everything_down() {
    let closed = Arc::new(AtomicU32::new(0));

    let trigger = ListenerFn::arc(
        "trigger",
        |events: EventSink, ctx: CancellationToken| async move {
            events.send(Payload::new().with("message", "go")).await?;
            ctx.cancelled().await;
            Err(BotError::Cancelled)
        },
    );
    let finish = HandlerFn::arc(&[], |_ctx, _args| async {
        Err(BotError::exit_application("test finished"))
    });

    let worker_closed = closed.clone();
    let worker = Bot::builder("worker")
        .with_listener(trigger)
        .with_handler(finish)
        .with_before_close(move || {
            let closed = worker_closed.clone();
            async move {
                closed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .build()
        .unwrap();

    let idle = ListenerFn::arc(
        "idle",
        |_events: EventSink, ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(BotError::Cancelled)
        },
    );
    let bystander_closed = closed.clone();
    let bystander = Bot::builder("bystander")
        .with_listener(idle)
        .with_handler(noop_handler())
        .with_before_close(move || {
            let closed = bystander_closed.clone();
            async move {
                closed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .build()
        .unwrap();

    BotApp::new()
        .add_bot(worker)
        .unwrap()
        .add_bot(bystander)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn last_bot_exiting_stops_the_application() {
    let done = ListenerFn::arc(
        "done",
        |_events: EventSink, _ctx: CancellationToken| async { Ok(()) },
    );
    let bot = Bot::builder("oneshot")
        .with_listener(done)
        .with_handler(noop_handler())
        .build()
        .unwrap();

    let err = BotApp::new()
        .add_bot(bot)
        .unwrap()
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::AllBotsStopped));
}

#[tokio::test]
async fn idle_only_application_stops_immediately() {
    let bot = Bot::builder("sleeper")
        .with_task(TaskInfo::every(
            "never",
            noop_handler(),
            Duration::from_secs(3600),
        ))
        .with_run_at_start(false)
        .build()
        .unwrap();

    let err = BotApp::new()
        .add_bot(bot)
        .unwrap()
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::AllBotsStopped));
}

#[tokio::test]
async fn restart_signal_gets_a_fresh_listener() {
    let starts = Arc::new(AtomicU32::new(0));

    let listener_starts = starts.clone();
    let flappy = ListenerFn::arc(
        "flappy",
        move |events: EventSink, ctx: CancellationToken| {
            let starts = listener_starts.clone();
            async move {
                let attempt = starts.fetch_add(1, Ordering::SeqCst) + 1;
                events.send(Payload::new().with("attempt", attempt)).await?;
                ctx.cancelled().await;
                Err(BotError::Cancelled)
            }
        },
    );
    let decide = HandlerFn::arc(&["attempt"], |_ctx, args: Payload| async move {
        match args.get("attempt").and_then(Value::as_u64) {
            Some(1) => Err(BotError::RestartListening),
            _ => Err(BotError::exit_application("second attempt seen")),
        }
    });
    let bot = Bot::builder("flappy")
        .with_listener(flappy)
        .with_handler(decide)
        .build()
        .unwrap();

    BotApp::new().add_bot(bot).unwrap().run().await.unwrap();
    assert_eq!(starts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn start_signal_launches_an_idle_bot() {
    let worker_ran = Arc::new(AtomicBool::new(false));

    let ran = worker_ran.clone();
    let worker_listener = ListenerFn::arc(
        "worker",
        move |_events: EventSink, _ctx: CancellationToken| {
            let ran = ran.clone();
            async move {
                ran.store(true, Ordering::SeqCst);
                Err(BotError::exit_application("worker came up"))
            }
        },
    );
    let worker = Bot::builder("worker")
        .with_listener(worker_listener)
        .with_handler(noop_handler())
        .with_run_at_start(false)
        .build()
        .unwrap();

    let admin_listener = ListenerFn::arc(
        "admin",
        |events: EventSink, ctx: CancellationToken| async move {
            events
                .send(Payload::new().with("message", "start worker"))
                .await?;
            ctx.cancelled().await;
            Err(BotError::Cancelled)
        },
    );
    let start_worker = HandlerFn::arc(&[], |ctx: HandlerContext, _args| async move {
        match ctx.registry.start("worker").await {
            Ok(signal) => Err(signal),
            Err(refusal) => Err(BotError::invalid(refusal.to_string())),
        }
    });
    let admin = Bot::builder("admin")
        .with_listener(admin_listener)
        .with_handler(start_worker)
        .build()
        .unwrap();

    BotApp::new()
        .add_bot(admin)
        .unwrap()
        .add_bot(worker)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(worker_ran.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn stopping_a_bot_cancels_its_listener() {
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let watcher_log = log.clone();
    let watcher_listener = ListenerFn::arc(
        "watcher",
        move |_events: EventSink, ctx: CancellationToken| {
            let log = watcher_log.clone();
            async move {
                ctx.cancelled().await;
                log.lock().unwrap().push("watcher cancelled".into());
                Err(BotError::Cancelled)
            }
        },
    );
    let watcher = Bot::builder("watcher")
        .with_listener(watcher_listener)
        .with_handler(noop_handler())
        .build()
        .unwrap();

    let admin_listener = ListenerFn::arc(
        "admin",
        |events: EventSink, ctx: CancellationToken| async move {
            events.send(Payload::new().with("step", "stop")).await?;
            tokio::time::sleep(Duration::from_millis(100)).await;
            events.send(Payload::new().with("step", "check")).await?;
            ctx.cancelled().await;
            Err(BotError::Cancelled)
        },
    );
    let admin_log = log.clone();
    let admin_handler = HandlerFn::arc(
        &["step"],
        move |ctx: HandlerContext, args: Payload| {
            let log = admin_log.clone();
            async move {
                match args.str("step") {
                    Some("stop") => {
                        let stopped = ctx.registry.stop("watcher").await;
                        log.lock().unwrap().push(format!("stop accepted: {stopped}"));
                        Ok(Value::Null)
                    }
                    _ => {
                        let running = ctx.registry.running().await;
                        log.lock().unwrap().push(format!("running: {running:?}"));
                        Err(BotError::exit_application("checked"))
                    }
                }
            }
        },
    );
    let admin = Bot::builder("admin")
        .with_listener(admin_listener)
        .with_handler(admin_handler)
        .build()
        .unwrap();

    BotApp::new()
        .add_bot(watcher)
        .unwrap()
        .add_bot(admin)
        .unwrap()
        .run()
        .await
        .unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log[0], "stop accepted: true");
    assert_eq!(log[1], "watcher cancelled");
    assert_eq!(log[2], r#"running: ["admin"]"#);
}

#[tokio::test(start_paused = true)]
async fn tasks_fire_while_their_bot_is_idle() {
    let beats = Arc::new(AtomicU32::new(0));

    let counter = beats.clone();
    let beat = HandlerFn::arc(&[], move |_ctx, _args| {
        let beats = counter.clone();
        async move {
            let n = beats.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= 3 {
                Err(BotError::exit_application("three beats"))
            } else {
                Ok(Value::Null)
            }
        }
    });
    let metronome = Bot::builder("metronome")
        .with_task(TaskInfo::every("beat", beat, Duration::from_secs(1)))
        .with_run_at_start(false)
        .build()
        .unwrap();

    let anchor_listener = ListenerFn::arc(
        "anchor",
        |_events: EventSink, ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(BotError::Cancelled)
        },
    );
    let anchor = Bot::builder("anchor")
        .with_listener(anchor_listener)
        .with_handler(noop_handler())
        .build()
        .unwrap();

    BotApp::new()
        .add_bot(metronome)
        .unwrap()
        .add_bot(anchor)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(beats.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn run_oneshot_routes_chat_commands() {
    let sent = Arc::new(Mutex::new(Vec::<(String, String)>::new()));

    let pong = HandlerFn::arc(&[], |ctx: HandlerContext, _args| async move {
        match &ctx.chat {
            Some(chat) => chat.reply("pong").await,
            None => Err(BotError::invalid("chat missing")),
        }
    });

    let outbox = sent.clone();
    let bot = Bot::builder("pinger")
        .with_listener(Arc::new(StubListener))
        .with_command(Command::new("ping", pong))
        .with_sender(move |message: String, user: String| {
            let outbox = outbox.clone();
            async move {
                outbox.lock().unwrap().push((user, message));
                Ok(Value::Null)
            }
        })
        .build()
        .unwrap();

    let value = BotApp::new()
        .add_bot(bot)
        .unwrap()
        .run_oneshot(Payload::new().with("message", "Ping").with("sender", "tester"))
        .await
        .unwrap();

    assert_eq!(value, Value::Null);
    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "tester");
    assert_eq!(sent[0].1, "pong");
}
