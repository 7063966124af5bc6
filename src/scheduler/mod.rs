//! # Scheduled task execution.
//!
//! This module provides the periodic side of a bot application:
//! - [`TaskInfo`] - declaration of a task (handler plus triggers)
//! - [`Trigger`] / [`PeriodTrigger`] - when a task should fire
//! - [`Scheduler`] - pluggable execution strategy
//! - [`TickScheduler`] - the built-in cooperative polling scheduler
//!
//! The runtime owns one scheduler for the whole application and
//! registers every bot's tasks with it, wrapped into [`TaskCaller`]
//! closures that carry the owning bot's environment.

mod task;
mod tick;
mod trigger;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{BotError, SchedulerError};

pub use task::{TaskCaller, TaskInfo};
pub use tick::TickScheduler;
pub use trigger::{PeriodTrigger, Trigger, TriggerRef};

/// Shared reference to a scheduler.
pub type SchedulerRef = Arc<dyn Scheduler>;

/// Task execution strategy.
///
/// Implementations decide how (and how precisely) registered tasks
/// fire; the runtime registers and removes tasks as bots start and
/// stop, and runs the scheduler as one of its supervised units.
#[async_trait]
pub trait Scheduler: Send + Sync + 'static {
    /// Registers a task. Names are unique per scheduler.
    async fn add_task(&self, info: TaskInfo, caller: TaskCaller) -> Result<(), SchedulerError>;

    /// Removes a task by name.
    async fn remove_task(&self, name: &str) -> Result<(), SchedulerError>;

    /// Names of all registered tasks.
    async fn list_tasks(&self) -> Vec<String>;

    /// Runs until cancelled or until a task yields a control error.
    async fn run(&self, ctx: CancellationToken) -> Result<(), BotError>;
}
