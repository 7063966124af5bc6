use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{BotError, SchedulerError};

use super::task::{TaskCaller, TaskInfo};
use super::Scheduler;

struct TaskContainer {
    info: TaskInfo,
    caller: TaskCaller,
    registered_at: Instant,
    last_called: Option<Instant>,
    called_once: bool,
}

impl TaskContainer {
    fn should_run(&self, now: Instant) -> bool {
        if self.info.run_at_start() && !self.called_once {
            return true;
        }
        let origin = self.last_called.unwrap_or(self.registered_at);
        let idle = now.duration_since(origin);
        self.info
            .triggers()
            .iter()
            .filter_map(|t| t.as_period())
            .any(|period| idle >= period)
    }
}

/// Cooperative polling scheduler.
///
/// Wakes every tick, fires the tasks whose period elapsed, and runs
/// them sequentially on the scheduler's own task. A task is marked
/// called when it is selected, so a slow task delays its peers but
/// never piles up repeat runs of itself.
///
/// ## Rules
/// - Only periodic triggers are accepted.
/// - Due tasks run in registration order.
/// - Control errors from a task abort the scheduler run; the runtime
///   decides what happens next.
pub struct TickScheduler {
    tick: Duration,
    tasks: RwLock<Vec<TaskContainer>>,
}

impl TickScheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            tasks: RwLock::new(Vec::new()),
        }
    }

    /// Runs every task whose trigger is due, in registration order.
    async fn run_pending(&self) -> Result<(), BotError> {
        let now = Instant::now();
        let due: Vec<(String, TaskCaller)> = {
            let mut tasks = self.tasks.write().await;
            tasks
                .iter_mut()
                .filter(|c| c.should_run(now))
                .map(|c| {
                    c.called_once = true;
                    c.last_called = Some(now);
                    (c.info.name().to_string(), c.caller.clone())
                })
                .collect()
        };
        for (name, caller) in due {
            tracing::trace!(task = %name, "task fires");
            caller().await?;
            tokio::task::yield_now().await;
        }
        Ok(())
    }
}

impl Default for TickScheduler {
    /// One-second tick.
    fn default() -> Self {
        Self::new(Config::DEFAULT_TICK)
    }
}

#[async_trait]
impl Scheduler for TickScheduler {
    async fn add_task(&self, info: TaskInfo, caller: TaskCaller) -> Result<(), SchedulerError> {
        for trigger in info.triggers() {
            if trigger.as_period().is_none() {
                return Err(SchedulerError::UnsupportedTrigger {
                    kind: trigger.kind().to_string(),
                });
            }
        }
        let mut tasks = self.tasks.write().await;
        if tasks.iter().any(|c| c.info.name() == info.name()) {
            return Err(SchedulerError::DuplicateTask {
                name: info.name().to_string(),
            });
        }
        tasks.push(TaskContainer {
            info,
            caller,
            registered_at: Instant::now(),
            last_called: None,
            called_once: false,
        });
        Ok(())
    }

    async fn remove_task(&self, name: &str) -> Result<(), SchedulerError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|c| c.info.name() != name);
        if tasks.len() == before {
            return Err(SchedulerError::UnknownTask {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    async fn list_tasks(&self) -> Vec<String> {
        self.tasks
            .read()
            .await
            .iter()
            .map(|c| c.info.name().to_string())
            .collect()
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), BotError> {
        // Let freshly spawned siblings settle before the first sweep.
        tokio::task::yield_now().await;
        loop {
            self.run_pending().await?;
            tokio::select! {
                _ = ctx.cancelled() => return Err(BotError::Cancelled),
                _ = tokio::time::sleep(self.tick) => {}
            }
        }
    }
}

impl std::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickScheduler")
            .field("tick", &self.tick)
            .finish()
    }
}
