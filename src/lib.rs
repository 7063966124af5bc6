//! # botvisor
//!
//! **Botvisor** is a supervised bot runtime for Rust.
//!
//! A *bot* pairs a listener (any event source: a chat connection, a message
//! queue, a socket) with a middleware pipeline that turns each event into a
//! handler call. The runtime supervises many bots at once, restarts failed
//! listeners with an error-rate throttle, and drives periodic tasks through
//! a cooperative scheduler. Bots fail independently: one bot's crash,
//! restart, or pause never touches its neighbours.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │     Bot      │   │     Bot      │   │     Bot      │
//!     │ (chat bot)   │   │ (plain bot)  │   │ (task-only)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  BotApp ──► AppContainer (bots + root logger + scheduler)         │
//! │  Supervisor (one JoinSet of units)                                │
//! │  - BotRegistry (run-state table: names, tokens, stop/start)       │
//! │  - TickScheduler (periodic tasks, one unit beside the bots)       │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   BotActor   │   │   BotActor   │   │   BotActor   │
//!     │ (pump loop)  │   │ (pump loop)  │   │ (pump loop)  │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │                  │                  │
//!      │ Listener ──► bounded channel ──► middleware chain:
//!      │
//!      │   CatchErrors ─► LoadContext ─► [BuildChat ─► RouteCommand]
//!      │       ─► user middleware ─► Invoke ─► Handler
//!      │
//!      │ Exit verdicts (BotError) flow back to the Supervisor:
//!      │ - RestartListening   ─► fresh listener, same bot
//!      │ - StartBot{name}     ─► relaunch raiser + start target
//!      │ - ExitBot{reason}    ─► retire this bot
//!      │ - ExitApplication    ─► wind the whole application down
//!      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │            Logger (per bot, bound by name via LoggerFactory)      │
//! │            ConsoleLogger (tracing) / AdminLogger (report channel) │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle (one bot)
//! ```text
//! Bot ──► Supervisor ──► BotActor::run()
//!
//! loop {
//!   ├─► spawn listener (child token), monitor = ErrorRateMonitor
//!   ├─► pump: recv payload ──► chain.run(payload)
//!   │       │
//!   │       ├─ listener Ok        ─► bot is done, exit
//!   │       ├─ RestartListening   ─► continue (fresh listener)
//!   │       ├─ control signal     ─► hand to Supervisor
//!   │       └─ failure ──► log exception
//!   │             ├─ within startup grace  ─► ExitBot
//!   │             ├─ rate above threshold  ─► pause, wind counter back
//!   │             └─ otherwise             ─► continue (fresh listener)
//!   │
//!   └─ exit conditions:
//!        - runtime token cancelled (signal, stop(), ExitApplication)
//!        - listener finished cleanly
//!        - ExitBot / ExitApplication raised by a handler
//! }
//!
//! On exit: Supervisor classifies the verdict, retires or relaunches the
//! bot, and reports the transition through the root logger.
//! ```
//!
//! ## Features
//! | Area               | Description                                                         | Key types / traits                         |
//! |--------------------|---------------------------------------------------------------------|--------------------------------------------|
//! | **Bots**           | Declare units from closures or trait impls, validated at build.     | [`Bot`], [`BotBuilder`], [`Listener`], [`Handler`] |
//! | **Chat commands**  | Longest-prefix command routing with per-command access lists.       | [`Command`], [`CommandTrie`], [`Chat`]     |
//! | **Middleware**     | Composable pipeline around every handler call.                      | [`Middleware`], [`Chain`], [`Frame`]       |
//! | **Scheduling**     | Periodic tasks beside the bots, one cooperative tick loop.          | [`Scheduler`], [`TickScheduler`], [`TaskInfo`] |
//! | **Supervision**    | Independent failure domains, restart throttling, admin start/stop.  | [`BotApp`], [`BotRegistry`], [`ErrorRateMonitor`] |
//! | **Errors**         | Typed verdicts and control signals on one error channel.            | [`BotError`], [`BuildError`], [`RuntimeError`] |
//! | **Logging**        | Per-bot loggers, optional out-of-band admin reports.                | [`Logger`], [`ConsoleLogger`], [`AdminLogger`] |
//! | **Configuration**  | Queue depth, scheduler tick, shutdown grace, throttle thresholds.   | [`Config`], [`ThrottlePolicy`]             |
//!
//! ## Example
//! ```rust
//! use botvisor::{Bot, BotApp, BotError, EventSink, HandlerFn, ListenerFn, Payload};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A listener that emits a single event and then waits for shutdown.
//!     let once = ListenerFn::arc("once", |events: EventSink, ctx: CancellationToken| async move {
//!         events.send(Payload::new().with("message", "hello")).await?;
//!         ctx.cancelled().await;
//!         Err(BotError::Cancelled)
//!     });
//!
//!     // The handler greets and winds the application down.
//!     let greet = HandlerFn::arc(&["message"], |_ctx, args: Payload| async move {
//!         println!("got: {}", args.str("message").unwrap_or_default());
//!         Err(BotError::exit_application("demo finished"))
//!     });
//!
//!     let bot = Bot::builder("hello")
//!         .with_listener(once)
//!         .with_handler(greet)
//!         .build()?;
//!
//!     BotApp::new().add_bot(bot)?.run().await?;
//!     Ok(())
//! }
//! ```

mod app;
mod bots;
mod chat;
mod config;
mod error;
mod inject;
mod logging;
mod middleware;
mod payload;
mod runtime;
mod scheduler;

// ---- Public re-exports ----

pub use app::{AppContainer, BotApp};
pub use bots::{
    Bot, BotBuilder, EventSink, Handler, HandlerContext, HandlerFn, HandlerRef, HookFn, Listener,
    ListenerFn, ListenerRef, StubListener,
};
pub use chat::{is_user_allowed, Chat, ChatTexts, Command, CommandTrie, CompiledCommand, SenderFn};
pub use config::{Config, ThrottlePolicy};
pub use error::{BotError, BuildError, RuntimeError, SchedulerError};
pub use inject::Providers;
pub use logging::{
    AdminLogger, AdminLoggerFactory, ConsoleLogger, ConsoleLoggerFactory, Logger, LoggerFactory,
    LoggerRef, ReportFn,
};
pub use middleware::{
    BuildChat, CatchErrors, Chain, Frame, Invoke, LoadContext, Middleware, MiddlewareRef, Next,
    RouteCommand, RunContext,
};
pub use payload::Payload;
pub use runtime::{wait_for_shutdown_signal, BotRegistry, ErrorRateMonitor, StartRefusal};
pub use scheduler::{
    PeriodTrigger, Scheduler, SchedulerRef, TaskCaller, TaskInfo, TickScheduler, Trigger,
    TriggerRef,
};
