//! # Admin logger: out-of-band delivery of severe lines.
//!
//! [`AdminLogger`] decorates a base logger. Everything still reaches the
//! base; `error`, `critical`, and `report` lines are additionally handed to
//! an async [`ReportFn`]: typically a closure that messages an operator
//! chat. A failing report channel is logged locally and swallowed: loggers
//! never propagate errors into the code that called them.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::{ConsoleLogger, Logger, LoggerFactory, LoggerRef};

/// Async delivery channel for operator reports.
///
/// ```
/// use botvisor::ReportFn;
/// use std::sync::Arc;
///
/// let report: ReportFn = Arc::new(|text: String| {
///     Box::pin(async move {
///         println!("-> admin: {text}");
///         Ok(())
///     })
/// });
/// # let _ = report;
/// ```
pub type ReportFn = Arc<dyn Fn(String) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Decorator that forwards severe lines to an admin channel.
pub struct AdminLogger {
    bot: Arc<str>,
    inner: LoggerRef,
    send: ReportFn,
}

impl AdminLogger {
    /// Wraps `inner`, forwarding severe lines for bot `bot` through `send`.
    pub fn new(bot: impl Into<Arc<str>>, inner: LoggerRef, send: ReportFn) -> Self {
        Self {
            bot: bot.into(),
            inner,
            send,
        }
    }

    async fn deliver(&self, text: String) {
        if let Err(e) = (self.send)(text).await {
            self.inner.warn(&format!("admin report failed: {e:#}"));
        }
    }
}

#[async_trait]
impl Logger for AdminLogger {
    fn debug(&self, message: &str) {
        self.inner.debug(message);
    }

    fn info(&self, message: &str) {
        self.inner.info(message);
    }

    fn warn(&self, message: &str) {
        self.inner.warn(message);
    }

    async fn error(&self, message: &str) {
        self.inner.error(message).await;
        self.deliver(format!("[{}] ERROR: {message}", self.bot)).await;
    }

    async fn critical(&self, message: &str) {
        self.inner.critical(message).await;
        self.deliver(format!("[{}] CRITICAL: {message}", self.bot))
            .await;
    }

    async fn report(&self, message: &str) {
        self.inner.info(message);
        self.deliver(format!("[{}] {message}", self.bot)).await;
    }
}

/// Factory producing [`AdminLogger`]s over per-bot console loggers.
#[derive(Clone)]
pub struct AdminLoggerFactory {
    send: ReportFn,
}

impl AdminLoggerFactory {
    /// Creates a factory delivering severe lines through `send`.
    pub fn new(send: ReportFn) -> Self {
        Self { send }
    }
}

impl LoggerFactory for AdminLoggerFactory {
    fn for_bot(&self, name: &str) -> LoggerRef {
        Arc::new(AdminLogger::new(
            name,
            Arc::new(ConsoleLogger::named(name)),
            self.send.clone(),
        ))
    }
}
