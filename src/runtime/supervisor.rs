use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::bots::{Bot, HandlerContext};
use crate::config::Config;
use crate::error::{BotError, RuntimeError, SchedulerError};
use crate::logging::LoggerRef;
use crate::payload::Payload;
use crate::scheduler::{SchedulerRef, TaskCaller, TaskInfo};

use super::actor::BotActor;
use super::registry::BotRegistry;
use super::shutdown::wait_for_shutdown_signal;

/// Unit name of the application-wide scheduler. Reserved: no bot may
/// take it.
pub(crate) const SCHEDULER_UNIT: &str = "__sched__";

/// Owns the supervision loop of a running application.
///
/// Each bot runs as an independently failing unit in one [`JoinSet`],
/// next to the scheduler unit. The supervisor waits for unit exits,
/// classifies the verdict, and reacts: respawn, retire, start a
/// sibling, or wind the whole application down.
pub(crate) struct Supervisor {
    bots: HashMap<String, Arc<Bot>>,
    order: Vec<String>,
    registry: Arc<BotRegistry>,
    scheduler: SchedulerRef,
    logger: LoggerRef,
    config: Config,
}

impl Supervisor {
    pub(crate) fn new(
        bots: Vec<Arc<Bot>>,
        registry: Arc<BotRegistry>,
        scheduler: SchedulerRef,
        logger: LoggerRef,
        config: Config,
    ) -> Self {
        let order: Vec<String> = bots.iter().map(|b| b.name().to_string()).collect();
        let bots = bots
            .into_iter()
            .map(|b| (b.name().to_string(), b))
            .collect();
        Self {
            bots,
            order,
            registry,
            scheduler,
            logger,
            config,
        }
    }

    pub(crate) async fn run(self) -> Result<(), RuntimeError> {
        let runtime = CancellationToken::new();
        let mut units: JoinSet<Result<(), BotError>> = JoinSet::new();
        let mut names: HashMap<Id, String> = HashMap::new();

        for name in &self.order {
            let bot = &self.bots[name];
            bot.run_before_start().await.map_err(|err| RuntimeError::Startup {
                message: format!("before_start of bot '{name}' failed: {err}"),
            })?;
        }

        // Every bot's tasks are registered up front, idle bots included:
        // a task fires as long as its bot is enabled, running or not.
        for name in &self.order {
            let bot = &self.bots[name];
            for task in bot.tasks() {
                self.scheduler
                    .add_task(task.clone(), self.task_caller(bot, task))
                    .await
                    .map_err(|err| RuntimeError::Startup {
                        message: format!("registering task '{}' failed: {err}", task.name()),
                    })?;
            }
        }

        for name in &self.order {
            if self.bots[name].run_at_start() {
                self.spawn_bot(&mut units, &mut names, &runtime, name).await;
            }
        }
        self.spawn_scheduler(&mut units, &mut names, &runtime);

        loop {
            if self.registry.running().await.is_empty() {
                self.logger
                    .report("application closed: no bots are running")
                    .await;
                runtime.cancel();
                self.drain(&mut units).await;
                self.close_all_bots().await;
                return Err(RuntimeError::AllBotsStopped);
            }

            tokio::select! {
                signal = wait_for_shutdown_signal() => {
                    if let Err(err) = signal {
                        self.logger
                            .critical(&format!("signal listener failed: {err}"))
                            .await;
                    }
                    return self
                        .exit_application("application closed by signal", &runtime, &mut units)
                        .await;
                }
                joined = units.join_next_with_id() => {
                    let (name, verdict) = match joined {
                        None => continue,
                        Some(Ok((id, verdict))) => {
                            (names.remove(&id).unwrap_or_default(), verdict)
                        }
                        Some(Err(join_err)) => {
                            let name = names.remove(&join_err.id()).unwrap_or_default();
                            let verdict = Err(BotError::failed(format!(
                                "unit panicked: {join_err}"
                            )));
                            (name, verdict)
                        }
                    };
                    let exit = self
                        .handle_unit_exit(&name, verdict, &runtime, &mut units, &mut names)
                        .await;
                    if let Some(result) = exit {
                        return result;
                    }
                }
            }
        }
    }

    /// Reacts to one unit exit; `Some` means the application is done.
    async fn handle_unit_exit(
        &self,
        name: &str,
        verdict: Result<(), BotError>,
        runtime: &CancellationToken,
        units: &mut JoinSet<Result<(), BotError>>,
        names: &mut HashMap<Id, String>,
    ) -> Option<Result<(), RuntimeError>> {
        if name == SCHEDULER_UNIT {
            return self
                .handle_scheduler_exit(verdict, runtime, units, names)
                .await;
        }

        self.registry.mark_stopped(name).await;
        let Some(bot) = self.bots.get(name) else {
            self.logger
                .critical(&format!("unknown unit '{name}' exited"))
                .await;
            return None;
        };

        match verdict {
            Ok(()) => {
                bot.logger()
                    .critical(&format!(
                        "bot '{name}' finished unexpectedly and will not be relaunched"
                    ))
                    .await;
            }
            Err(BotError::Cancelled) => {
                bot.logger().warn(&format!("bot '{name}' was cancelled"));
                self.retire_bot(bot).await;
                bot.logger().report(&format!("bot '{name}' exited")).await;
            }
            Err(BotError::RestartListening) => {
                self.spawn_bot(units, names, runtime, name).await;
            }
            Err(BotError::StartBot { name: target }) => {
                // The raiser's unit died delivering the signal; put it
                // back first, then bring up the target.
                self.spawn_bot(units, names, runtime, name).await;
                self.start_bot(&target, bot.logger(), runtime, units, names)
                    .await;
            }
            Err(BotError::ExitBot { reason }) => {
                bot.logger()
                    .error(&format!("bot '{name}' exited with message: {reason}"))
                    .await;
                self.retire_bot(bot).await;
                bot.logger().report(&format!("bot '{name}' exited")).await;
            }
            Err(BotError::ExitApplication { reason }) => {
                self.retire_bot(bot).await;
                bot.logger().report(&format!("bot '{name}' exited")).await;
                return Some(self.exit_application(&reason, runtime, units).await);
            }
            Err(err) => {
                bot.logger()
                    .critical(&format!("bot '{name}' failed: [{}] {err}", err.as_label()))
                    .await;
                self.retire_bot(bot).await;
                bot.logger().report(&format!("bot '{name}' exited")).await;
            }
        }
        None
    }

    async fn handle_scheduler_exit(
        &self,
        verdict: Result<(), BotError>,
        runtime: &CancellationToken,
        units: &mut JoinSet<Result<(), BotError>>,
        names: &mut HashMap<Id, String>,
    ) -> Option<Result<(), RuntimeError>> {
        match verdict {
            Err(BotError::ExitApplication { reason }) => {
                Some(self.exit_application(&reason, runtime, units).await)
            }
            Err(BotError::StartBot { name: target }) => {
                self.spawn_scheduler(units, names, runtime);
                self.start_bot(&target, &self.logger, runtime, units, names)
                    .await;
                None
            }
            other => {
                let summary = match other {
                    Ok(()) => "finished".to_string(),
                    Err(err) => err.to_string(),
                };
                self.logger
                    .critical(&format!("scheduler stopped ({summary}), restarting it"))
                    .await;
                self.spawn_scheduler(units, names, runtime);
                None
            }
        }
    }

    /// Brings a stopped bot up on request of `via` (a bot or the
    /// scheduler). Unknown and already-running targets are logged, not
    /// fatal.
    async fn start_bot(
        &self,
        target: &str,
        via: &LoggerRef,
        runtime: &CancellationToken,
        units: &mut JoinSet<Result<(), BotError>>,
        names: &mut HashMap<Id, String>,
    ) {
        let Some(bot) = self.bots.get(target) else {
            via.critical(&format!("cannot start unknown bot '{target}'"))
                .await;
            return;
        };
        if self.registry.is_running(target).await {
            via.critical(&format!("bot '{target}' is already running"))
                .await;
            return;
        }

        bot.enable();
        // Tasks may or may not still be registered, depending on how
        // the bot went down. Re-register and tolerate leftovers.
        for task in bot.tasks() {
            match self
                .scheduler
                .add_task(task.clone(), self.task_caller(bot, task))
                .await
            {
                Ok(()) | Err(SchedulerError::DuplicateTask { .. }) => {}
                Err(err) => {
                    via.critical(&format!(
                        "registering task '{}' of bot '{target}' failed: {err}",
                        task.name()
                    ))
                    .await;
                }
            }
        }
        self.spawn_bot(units, names, runtime, target).await;
        self.logger.report(&format!("bot '{target}' started")).await;
    }

    async fn spawn_bot(
        &self,
        units: &mut JoinSet<Result<(), BotError>>,
        names: &mut HashMap<Id, String>,
        runtime: &CancellationToken,
        name: &str,
    ) {
        let Some(bot) = self.bots.get(name) else {
            return;
        };
        let child = runtime.child_token();
        self.registry.insert_running(name, child.clone()).await;
        let actor = BotActor::new(
            Arc::clone(bot),
            Arc::clone(&self.registry),
            self.config.clone(),
        );
        let id = units.spawn(actor.run(child)).id();
        names.insert(id, name.to_string());
    }

    fn spawn_scheduler(
        &self,
        units: &mut JoinSet<Result<(), BotError>>,
        names: &mut HashMap<Id, String>,
        runtime: &CancellationToken,
    ) {
        let child = runtime.child_token();
        let scheduler = Arc::clone(&self.scheduler);
        let id = units
            .spawn(async move { scheduler.run(child).await })
            .id();
        names.insert(id, SCHEDULER_UNIT.to_string());
    }

    /// Bookkeeping for a bot that is gone: no more task fires, no
    /// event processing until somebody starts it again.
    async fn retire_bot(&self, bot: &Arc<Bot>) {
        bot.disable();
        for task in bot.tasks() {
            match self.scheduler.remove_task(task.name()).await {
                // Already gone is fine: retirement must be idempotent.
                Ok(()) | Err(SchedulerError::UnknownTask { .. }) => {}
                Err(err) => {
                    bot.logger()
                        .warn(&format!("removing task '{}': {err}", task.name()));
                }
            }
        }
    }

    /// Full application shutdown: stop every bot, run the close hooks,
    /// leave a final report.
    async fn exit_application(
        &self,
        reason: &str,
        runtime: &CancellationToken,
        units: &mut JoinSet<Result<(), BotError>>,
    ) -> Result<(), RuntimeError> {
        for (name, token) in self.registry.running_tokens().await {
            token.cancel();
            self.registry.mark_stopped(&name).await;
            if let Some(bot) = self.bots.get(&name) {
                self.retire_bot(bot).await;
                bot.logger().report(&format!("bot '{name}' exited")).await;
            }
        }
        runtime.cancel();
        self.drain(units).await;
        self.close_all_bots().await;
        self.logger
            .report(&format!("application closed: {reason}"))
            .await;
        Ok(())
    }

    async fn close_all_bots(&self) {
        for name in &self.order {
            let bot = &self.bots[name];
            if let Err(err) = bot.run_before_close().await {
                bot.logger()
                    .warn(&format!("before_close of bot '{name}' failed: {err}"));
            }
        }
    }

    /// Waits for cancelled units to wind down, aborting stragglers
    /// after the configured grace.
    async fn drain(&self, units: &mut JoinSet<Result<(), BotError>>) {
        let grace = self.config.grace_clamped();
        let done = async {
            while units.join_next().await.is_some() {}
        };
        if tokio::time::timeout(grace, done).await.is_err() {
            self.logger
                .critical(&format!(
                    "shutdown grace of {grace:?} exceeded, aborting remaining units"
                ))
                .await;
            units.abort_all();
        }
    }

    /// Wraps one task into the closure handed to the scheduler: skip
    /// when the bot is disabled, resolve arguments, guard failures the
    /// same way the pipeline guards handlers.
    fn task_caller(&self, bot: &Arc<Bot>, task: &TaskInfo) -> TaskCaller {
        let bot = Arc::clone(bot);
        let registry = Arc::clone(&self.registry);
        let handler = task.handler().clone();
        let task_name = task.name().to_string();

        Arc::new(move || -> BoxFuture<'static, Result<(), BotError>> {
            let bot = Arc::clone(&bot);
            let registry = Arc::clone(&registry);
            let handler = handler.clone();
            let task_name = task_name.clone();
            Box::pin(async move {
                if !bot.is_enabled() {
                    return Ok(());
                }
                let seed = Payload::new()
                    .with("name", bot.name())
                    .with("task", task_name.as_str());
                let outcome: Result<Value, BotError> = async {
                    let args = bot.providers().resolve(handler.params(), &seed)?;
                    let ctx = HandlerContext {
                        bot: bot.name_arc(),
                        logger: bot.logger().clone(),
                        registry,
                        chat: None,
                        command: None,
                    };
                    handler.call(ctx, args).await
                }
                .await;
                match outcome {
                    Ok(_) => Ok(()),
                    Err(err) if err.is_control() => Err(err),
                    Err(BotError::Invalid { message }) => {
                        bot.logger()
                            .critical(&format!(
                                "Fix the code. Critical invalid usage raised: {message}"
                            ))
                            .await;
                        Ok(())
                    }
                    Err(err) => {
                        bot.logger()
                            .exception(&format!("task '{task_name}' failed"), &err)
                            .await;
                        Ok(())
                    }
                }
            })
        })
    }
}
