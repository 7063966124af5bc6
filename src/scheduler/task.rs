use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::bots::HandlerRef;
use crate::error::BotError;

use super::trigger::{PeriodTrigger, TriggerRef};

/// Ready-to-run closure the runtime registers with a scheduler.
///
/// The runtime builds one per task; it already carries the owning
/// bot's providers, logger and error guards.
pub type TaskCaller = Arc<dyn Fn() -> BoxFuture<'static, Result<(), BotError>> + Send + Sync>;

/// Declaration of one scheduled task.
///
/// Tasks belong to a bot and share its providers; the handler's params
/// are resolved fresh on every fire. Task names are unique across the
/// whole application.
#[derive(Clone)]
pub struct TaskInfo {
    name: String,
    handler: HandlerRef,
    triggers: Vec<TriggerRef>,
    run_at_start: bool,
}

impl TaskInfo {
    pub fn new(name: impl Into<String>, handler: HandlerRef, triggers: Vec<TriggerRef>) -> Self {
        Self {
            name: name.into(),
            handler,
            triggers,
            run_at_start: false,
        }
    }

    /// Shorthand for a single-period task.
    pub fn every(name: impl Into<String>, handler: HandlerRef, period: Duration) -> Self {
        Self::new(name, handler, vec![Arc::new(PeriodTrigger::new(period))])
    }

    /// Also fire immediately on registration, not just after the first
    /// period elapses.
    pub fn with_run_at_start(mut self, run_at_start: bool) -> Self {
        self.run_at_start = run_at_start;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    #[inline]
    pub fn triggers(&self) -> &[TriggerRef] {
        &self.triggers
    }

    #[inline]
    pub fn run_at_start(&self) -> bool {
        self.run_at_start
    }
}

impl std::fmt::Debug for TaskInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskInfo")
            .field("name", &self.name)
            .field("triggers", &self.triggers.len())
            .field("run_at_start", &self.run_at_start)
            .finish()
    }
}
