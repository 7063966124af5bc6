//! # Console logger over `tracing`.
//!
//! [`ConsoleLogger`] maps the [`Logger`] levels onto `tracing` events with
//! the bot name attached as a field. Install any `tracing` subscriber
//! (e.g. `tracing_subscriber::fmt`) to see the output; without one the
//! events are simply discarded, which keeps tests quiet.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Logger, LoggerFactory, LoggerRef};

/// Logger that emits `tracing` events labeled with the bot name.
///
/// `critical` maps onto the `error` level with a `critical = true` field
/// (`tracing` has no level above error).
#[derive(Clone, Debug)]
pub struct ConsoleLogger {
    bot: Arc<str>,
}

impl ConsoleLogger {
    /// Creates a logger labeled with `bot`.
    pub fn named(bot: impl Into<Arc<str>>) -> Self {
        Self { bot: bot.into() }
    }
}

#[async_trait]
impl Logger for ConsoleLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(bot = %self.bot, "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(bot = %self.bot, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(bot = %self.bot, "{message}");
    }

    async fn error(&self, message: &str) {
        tracing::error!(bot = %self.bot, "{message}");
    }

    async fn critical(&self, message: &str) {
        tracing::error!(bot = %self.bot, critical = true, "{message}");
    }
}

/// Default factory: one [`ConsoleLogger`] per bot.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleLoggerFactory;

impl LoggerFactory for ConsoleLoggerFactory {
    fn for_bot(&self, name: &str) -> LoggerRef {
        Arc::new(ConsoleLogger::named(name))
    }
}
