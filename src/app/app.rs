use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::container::AppContainer;
use crate::bots::Bot;
use crate::config::Config;
use crate::error::{BotError, BuildError, RuntimeError};
use crate::logging::{ConsoleLoggerFactory, LoggerFactory};
use crate::middleware::RunContext;
use crate::payload::Payload;
use crate::runtime::{BotRegistry, SCHEDULER_UNIT};
use crate::scheduler::{SchedulerRef, TickScheduler};

/// Assembles bots into a runnable application.
///
/// `BotApp` is the entry point of the crate: collect built bots with
/// [`add_bot`](BotApp::add_bot), tune the runtime with the `with_*` methods,
/// then call [`run`](BotApp::run). Checks that span bots (name clashes, the
/// reserved scheduler name, task-name clashes) happen here; everything
/// inside a single bot is checked by [`BotBuilder::build`].
///
/// [`BotBuilder::build`]: crate::bots::BotBuilder::build
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use botvisor::{Bot, BotApp, HandlerFn, TaskInfo};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let beat = HandlerFn::arc(&[], |_ctx, _args| async {
///         println!("beat");
///         Ok(serde_json::Value::Null)
///     });
///
///     let clock = Bot::builder("clock")
///         .with_task(TaskInfo::every("beat", beat, Duration::from_secs(60)))
///         .build()?;
///
///     BotApp::new().add_bot(clock)?.run().await?;
///     Ok(())
/// }
/// ```
pub struct BotApp {
    bots: Vec<Arc<Bot>>,
    logger_factory: Arc<dyn LoggerFactory>,
    scheduler: Option<SchedulerRef>,
    config: Config,
}

impl BotApp {
    /// Creates an empty application with default settings.
    pub fn new() -> Self {
        Self {
            bots: Vec::new(),
            logger_factory: Arc::new(ConsoleLoggerFactory),
            scheduler: None,
            config: Config::default(),
        }
    }

    /// Sets the runtime configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the factory that binds the root logger.
    ///
    /// Per-bot loggers are bound at bot build time; this factory labels the
    /// runtime's own log lines.
    pub fn with_logger_factory(mut self, factory: Arc<dyn LoggerFactory>) -> Self {
        self.logger_factory = factory;
        self
    }

    /// Replaces the default tick scheduler.
    pub fn with_scheduler(mut self, scheduler: SchedulerRef) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Registers a built bot.
    ///
    /// Bot names are compared case-insensitively and must be unique; task
    /// names must be unique across the whole application because they share
    /// one scheduler.
    pub fn add_bot(mut self, bot: Bot) -> Result<Self, BuildError> {
        let folded = bot.name().to_lowercase();
        if folded == SCHEDULER_UNIT {
            return Err(BuildError::ReservedName {
                name: bot.name().to_string(),
            });
        }
        if self.bots.iter().any(|b| b.name().to_lowercase() == folded) {
            return Err(BuildError::DuplicateBot {
                name: bot.name().to_string(),
            });
        }
        for task in bot.tasks() {
            let clash = self
                .bots
                .iter()
                .flat_map(|b| b.tasks())
                .any(|t| t.name() == task.name());
            if clash {
                return Err(BuildError::DuplicateTask {
                    name: task.name().to_string(),
                });
            }
        }

        self.bots.push(Arc::new(bot));
        Ok(self)
    }

    /// Assembles the final container without running it.
    ///
    /// Fills in the defaults: a [`TickScheduler`] when none was set and a
    /// root logger from the configured factory.
    pub fn build(self) -> AppContainer {
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TickScheduler::new(self.config.tick_clamped())));
        let logger = self.logger_factory.for_bot("app");

        AppContainer::new(self.bots, logger, scheduler, self.config)
    }

    /// Runs the application until it is told to stop.
    ///
    /// Spawns every bot marked run-at-start plus the task scheduler, then
    /// supervises them. Returns `Ok(())` when a handler raised
    /// [`BotError::exit_application`] or an OS shutdown signal arrived;
    /// returns an error when the application could not start or when the
    /// last bot exited on its own.
    pub async fn run(self) -> Result<(), RuntimeError> {
        self.build().run().await
    }

    /// Pushes one payload through a single bot's pipeline and returns the
    /// handler result.
    ///
    /// The serverless path: no listener runs and nothing is supervised. The
    /// before-start hook, the full middleware chain, and the before-close
    /// hook all execute once. The application must hold exactly one bot.
    pub async fn run_oneshot(self, payload: Payload) -> Result<Value, BotError> {
        let bot = match self.bots.as_slice() {
            [bot] => Arc::clone(bot),
            _ => {
                return Err(BotError::invalid(format!(
                    "run_oneshot needs exactly one bot, got {}",
                    self.bots.len()
                )))
            }
        };

        let registry = Arc::new(BotRegistry::new(vec![bot.name().to_string()]));
        let run = RunContext {
            bot: Arc::clone(&bot),
            registry,
        };

        bot.run_before_start().await?;
        let outcome = bot.chain().run(&run, payload).await;
        if let Err(err) = bot.run_before_close().await {
            bot.logger().warn(&format!("before-close hook failed: {err}"));
        }
        outcome
    }
}

impl Default for BotApp {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BotApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.bots.iter().map(|b| b.name()).collect();
        f.debug_struct("BotApp")
            .field("bots", &names)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::bots::{HandlerFn, HandlerRef, StubListener};
    use crate::scheduler::TaskInfo;

    fn noop_handler() -> HandlerRef {
        HandlerFn::arc(&[], |_ctx, _args| async { Ok(Value::Null) })
    }

    fn task_bot(bot: &str, task: &str) -> Bot {
        Bot::builder(bot)
            .with_task(TaskInfo::every(
                task,
                noop_handler(),
                Duration::from_secs(1),
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn duplicate_bot_names_are_rejected() {
        let app = BotApp::new().add_bot(task_bot("Echo", "task-a")).unwrap();
        let err = app.add_bot(task_bot("echo", "task-b")).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateBot { name } if name == "echo"));
    }

    #[test]
    fn scheduler_unit_name_is_reserved() {
        let err = BotApp::new()
            .add_bot(task_bot("__sched__", "task-a"))
            .unwrap_err();
        assert!(matches!(err, BuildError::ReservedName { .. }));
    }

    #[test]
    fn task_names_must_be_unique_across_bots() {
        let app = BotApp::new().add_bot(task_bot("a", "sync")).unwrap();
        let err = app.add_bot(task_bot("b", "sync")).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateTask { name } if name == "sync"));
    }

    #[tokio::test]
    async fn empty_app_refuses_to_run() {
        let err = BotApp::new().run().await.unwrap_err();
        assert!(matches!(err, RuntimeError::NoBots));
    }

    #[tokio::test]
    async fn run_oneshot_returns_handler_result() {
        let hooks = Arc::new(AtomicU32::new(0));
        let on_start = hooks.clone();
        let on_close = hooks.clone();

        let echo = HandlerFn::arc(&["message"], |_ctx, args: Payload| async move {
            Ok(Value::String(args.str("message").unwrap().to_uppercase()))
        });
        let bot = Bot::builder("echo")
            .with_listener(Arc::new(StubListener))
            .with_handler(echo)
            .with_before_start(move || {
                let hooks = on_start.clone();
                async move {
                    hooks.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .with_before_close(move || {
                let hooks = on_close.clone();
                async move {
                    hooks.fetch_add(10, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build()
            .unwrap();

        let app = BotApp::new().add_bot(bot).unwrap();
        let value = app
            .run_oneshot(Payload::new().with("message", "hi"))
            .await
            .unwrap();

        assert_eq!(value, Value::String("HI".into()));
        assert_eq!(hooks.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn run_oneshot_requires_a_single_bot() {
        let err = BotApp::new().run_oneshot(Payload::new()).await.unwrap_err();
        assert!(matches!(err, BotError::Invalid { .. }));

        let app = BotApp::new()
            .add_bot(task_bot("a", "task-a"))
            .unwrap()
            .add_bot(task_bot("b", "task-b"))
            .unwrap();
        let err = app.run_oneshot(Payload::new()).await.unwrap_err();
        assert!(matches!(err, BotError::Invalid { .. }));
    }
}
