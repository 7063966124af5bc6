use std::fmt;
use std::sync::Arc;

use crate::bots::Bot;
use crate::config::Config;
use crate::error::RuntimeError;
use crate::logging::LoggerRef;
use crate::runtime::{BotRegistry, Supervisor};
use crate::scheduler::SchedulerRef;

/// Final assembled application: the bot set, the root logger, and the
/// scheduler, ready to be supervised.
///
/// Produced by [`BotApp::build`](crate::app::BotApp::build). Most callers go
/// through [`BotApp::run`](crate::app::BotApp::run) instead and never touch
/// the container directly.
pub struct AppContainer {
    bots: Vec<Arc<Bot>>,
    logger: LoggerRef,
    scheduler: SchedulerRef,
    config: Config,
}

impl AppContainer {
    pub(crate) fn new(
        bots: Vec<Arc<Bot>>,
        logger: LoggerRef,
        scheduler: SchedulerRef,
        config: Config,
    ) -> Self {
        Self {
            bots,
            logger,
            scheduler,
            config,
        }
    }

    /// Bots in registration order.
    pub fn bots(&self) -> &[Arc<Bot>] {
        &self.bots
    }

    /// Names of all registered bots, in registration order.
    pub fn bot_names(&self) -> Vec<String> {
        self.bots.iter().map(|b| b.name().to_string()).collect()
    }

    /// Root logger used by the runtime itself.
    pub fn logger(&self) -> &LoggerRef {
        &self.logger
    }

    /// Scheduler that drives the periodic tasks.
    pub fn scheduler(&self) -> &SchedulerRef {
        &self.scheduler
    }

    /// Runtime settings shared by the supervisor and every bot pump.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the container until every bot is gone or shutdown is requested.
    ///
    /// Builds the name registry from the bot set, hands everything to the
    /// supervisor, and waits for it to settle. See
    /// [`BotApp::run`](crate::app::BotApp::run) for the exit conditions.
    pub async fn run(self) -> Result<(), RuntimeError> {
        if self.bots.is_empty() {
            self.logger
                .critical("no bots were added, nothing to run")
                .await;
            return Err(RuntimeError::NoBots);
        }

        let registry = Arc::new(BotRegistry::new(self.bot_names()));
        Supervisor::new(
            self.bots,
            registry,
            self.scheduler,
            self.logger,
            self.config,
        )
        .run()
        .await
    }
}

impl fmt::Debug for AppContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContainer")
            .field("bots", &self.bot_names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
