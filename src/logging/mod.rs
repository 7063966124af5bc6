//! # Logging surface for bots and the runtime.
//!
//! This module provides the [`Logger`] trait, the built-in implementations,
//! and [`LoggerFactory`] for binding a logger to each bot by name.
//!
//! ## Architecture
//! ```text
//! Log flow:
//!   pump / middleware / handler ──► Logger (one per bot, bound by name)
//!                                      │
//!                       ┌──────────────┴──────────────┐
//!                       ▼                             ▼
//!                 ConsoleLogger                  AdminLogger
//!                 (tracing events)          (decorates a base logger;
//!                                            severe lines also go to an
//!                                            async ReportFn, e.g. a chat
//!                                            message to the operator)
//! ```
//!
//! ## Rules
//! - Loggers never fail: a broken report channel is logged locally and
//!   swallowed.
//! - `debug`/`info`/`warn` are synchronous; `error`/`critical`/`report`
//!   are async so decorators may deliver them out-of-band.
//! - [`Logger::report`] is operator-facing ("bot exited", "app closed");
//!   without an admin channel it degrades to `warn`.

mod admin;
mod console;

pub use admin::{AdminLogger, AdminLoggerFactory, ReportFn};
pub use console::{ConsoleLogger, ConsoleLoggerFactory};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BotError;

/// Shared reference to a logger.
pub type LoggerRef = Arc<dyn Logger>;

/// Logging surface handed to every bot and to the runtime itself.
///
/// Implementations must handle their own failures; no method returns a
/// `Result`.
#[async_trait]
pub trait Logger: Send + Sync + 'static {
    /// Development-level detail.
    fn debug(&self, message: &str);

    /// Routine progress.
    fn info(&self, message: &str);

    /// Something odd that the bot survived.
    fn warn(&self, message: &str);

    /// A failure worth an operator's attention.
    async fn error(&self, message: &str);

    /// A failure that needs code or configuration changes.
    async fn critical(&self, message: &str);

    /// Logs a caught error with its context.
    async fn exception(&self, context: &str, error: &BotError) {
        self.error(&format!("{context}: [{}] {error}", error.as_label()))
            .await;
    }

    /// Operator-facing lifecycle report. Defaults to [`Logger::warn`].
    async fn report(&self, message: &str) {
        self.warn(message);
    }
}

/// Binds loggers to bots by name.
///
/// The application calls [`LoggerFactory::for_bot`] once per bot at
/// assembly time and once for the runtime itself.
pub trait LoggerFactory: Send + Sync + 'static {
    /// Returns a logger labeled with `name`.
    fn for_bot(&self, name: &str) -> LoggerRef;
}
