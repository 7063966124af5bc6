//! Error types used by the botvisor runtime, builders, and handlers.
//!
//! This module defines four error enums, split by concern:
//!
//! - [`BotError`]: raised inside a running bot (listeners, handlers,
//!   middleware). Control signals travel through this type too.
//! - [`BuildError`]: configuration mistakes caught while assembling bots.
//! - [`SchedulerError`]: failures of the periodic-task table.
//! - [`RuntimeError`]: errors raised by the supervising runtime itself.
//!
//! [`BotError`] provides helper methods (`as_label`, `as_message`,
//! [`BotError::is_control`]) for logging and dispatch.

use thiserror::Error;

/// # Errors and control signals produced inside a running bot.
///
/// Two kinds of variants share this type:
///
/// * **Failures**: [`BotError::Invalid`] (programmer error: wrong key,
///   unresolvable parameter, misused API) and [`BotError::Failed`]
///   (anything transient). The middleware guard logs and swallows these;
///   the bot keeps running.
/// * **Control signals**: [`BotError::RestartListening`],
///   [`BotError::StartBot`], [`BotError::ExitBot`],
///   [`BotError::ExitApplication`], [`BotError::Cancelled`]. These are
///   never logged as bugs: every pipeline stage propagates them untouched
///   and the supervisor dispatches on them. Use [`BotError::is_control`]
///   to tell the kinds apart.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BotError {
    /// Request a fresh listener instance for the current bot (silent restart).
    #[error("listener restart requested")]
    RestartListening,

    /// Request the runtime to start another bot by name.
    ///
    /// The requesting bot is relaunched with a fresh execution context.
    #[error("start of bot '{name}' requested")]
    StartBot {
        /// Name of the bot to start.
        name: String,
    },

    /// Request a clean stop of the current bot (tasks removed, not relaunched).
    #[error("bot exit requested: {reason}")]
    ExitBot {
        /// Human-readable reason, included in the exit report.
        reason: String,
    },

    /// Request a clean stop of the whole application.
    #[error("application exit requested: {reason}")]
    ExitApplication {
        /// Human-readable reason, included in the final report.
        reason: String,
    },

    /// The execution's cancellation token fired while the bot was suspended.
    #[error("context cancelled")]
    Cancelled,

    /// Programmer error: the failure is in the calling code, not the input.
    #[error("invalid usage: {message}")]
    Invalid {
        /// What was misused.
        message: String,
    },

    /// Execution failed; may succeed on a later attempt.
    #[error("execution failed: {message}")]
    Failed {
        /// The underlying error message.
        message: String,
    },
}

impl BotError {
    /// Builds a [`BotError::StartBot`] signal.
    pub fn start_bot(name: impl Into<String>) -> Self {
        BotError::StartBot { name: name.into() }
    }

    /// Builds a [`BotError::ExitBot`] signal.
    pub fn exit_bot(reason: impl Into<String>) -> Self {
        BotError::ExitBot {
            reason: reason.into(),
        }
    }

    /// Builds a [`BotError::ExitApplication`] signal.
    pub fn exit_application(reason: impl Into<String>) -> Self {
        BotError::ExitApplication {
            reason: reason.into(),
        }
    }

    /// Builds a [`BotError::Invalid`] (programmer error).
    pub fn invalid(message: impl Into<String>) -> Self {
        BotError::Invalid {
            message: message.into(),
        }
    }

    /// Builds a [`BotError::Failed`] (transient failure).
    pub fn failed(message: impl Into<String>) -> Self {
        BotError::Failed {
            message: message.into(),
        }
    }

    /// Returns `true` for control signals, `false` for failures.
    ///
    /// Control signals must pass through guards untouched; only failures
    /// are subject to logging and the error-rate policy.
    ///
    /// # Example
    /// ```
    /// use botvisor::BotError;
    ///
    /// assert!(BotError::RestartListening.is_control());
    /// assert!(!BotError::failed("boom").is_control());
    /// ```
    pub fn is_control(&self) -> bool {
        !matches!(self, BotError::Invalid { .. } | BotError::Failed { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use botvisor::BotError;
    ///
    /// let err = BotError::exit_bot("done");
    /// assert_eq!(err.as_label(), "exit_bot");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BotError::RestartListening => "restart_listening",
            BotError::StartBot { .. } => "start_bot",
            BotError::ExitBot { .. } => "exit_bot",
            BotError::ExitApplication { .. } => "exit_application",
            BotError::Cancelled => "cancelled",
            BotError::Invalid { .. } => "invalid",
            BotError::Failed { .. } => "failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BotError::RestartListening => "listener restart requested".to_string(),
            BotError::StartBot { name } => format!("start requested: {name}"),
            BotError::ExitBot { reason } => format!("exit: {reason}"),
            BotError::ExitApplication { reason } => format!("app exit: {reason}"),
            BotError::Cancelled => "context cancelled".to_string(),
            BotError::Invalid { message } => format!("invalid: {message}"),
            BotError::Failed { message } => format!("error: {message}"),
        }
    }
}

/// # Errors caught while assembling bots and their applications.
///
/// These are raised before anything runs: duplicate names, missing
/// capabilities, malformed command patterns, bad trigger values.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BuildError {
    /// A bot with this name was already added to the application.
    #[error("bot name '{name}' is already taken")]
    DuplicateBot {
        /// The conflicting bot name.
        name: String,
    },

    /// The name is reserved for internal runtime units.
    #[error("bot name '{name}' is reserved")]
    ReservedName {
        /// The rejected name.
        name: String,
    },

    /// Two tasks share a name (task names are unique per application).
    #[error("task name '{name}' is already taken")]
    DuplicateTask {
        /// The conflicting task name.
        name: String,
    },

    /// Two commands of one bot compare equal after casefolding.
    #[error("command '{command}' is registered twice")]
    DuplicateCommand {
        /// The conflicting command text.
        command: String,
    },

    /// A bot without tasks must have a listener to produce events.
    #[error("bot '{bot}' has neither a listener nor tasks")]
    MissingListener {
        /// The incomplete bot's name.
        bot: String,
    },

    /// A bot with a listener needs a handler (or commands) to consume events.
    #[error("bot '{bot}' has a listener but nothing to handle its events")]
    MissingHandler {
        /// The incomplete bot's name.
        bot: String,
    },

    /// Command routing replies to chats and therefore requires a sender.
    #[error("bot '{bot}' routes commands but has no sender")]
    MissingSender {
        /// The incomplete bot's name.
        bot: String,
    },

    /// A command was marked admin-only on a bot with no admin configured.
    #[error("command '{command}' is admin-only but the bot has no admin")]
    NoAdmin {
        /// The offending command text.
        command: String,
    },

    /// A task was declared with an empty trigger list.
    #[error("task '{task}' has no triggers")]
    NoTriggers {
        /// The task's name.
        task: String,
    },

    /// A trigger was built from a rejected time value.
    #[error("invalid trigger: {message}")]
    InvalidTrigger {
        /// What was wrong with the value.
        message: String,
    },

    /// A command pattern failed to compile.
    #[error("command '{command}' produced a bad pattern: {message}")]
    BadPattern {
        /// The offending command text.
        command: String,
        /// The regex engine's message.
        message: String,
    },
}

/// # Errors produced by the periodic-task table.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// A task with this name is already scheduled.
    #[error("task '{name}' is already scheduled")]
    DuplicateTask {
        /// The conflicting task name.
        name: String,
    },

    /// No scheduled task carries this name.
    #[error("task '{name}' is not scheduled")]
    UnknownTask {
        /// The unknown task name.
        name: String,
    },

    /// The scheduler implementation does not understand this trigger kind.
    #[error("trigger kind '{kind}' is not supported")]
    UnsupportedTrigger {
        /// Label of the rejected trigger.
        kind: String,
    },
}

/// # Errors produced by the supervising runtime.
///
/// A clean, operator-requested shutdown is **not** an error: in that case
/// the runtime returns `Ok(())`. These variants cover the failure exits.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The application was started with no bots registered.
    #[error("no bots registered")]
    NoBots,

    /// Every user bot stopped and nothing is left to supervise.
    #[error("all bots stopped; nothing left to supervise")]
    AllBotsStopped,

    /// Startup work (hooks, task registration) failed before the loop began.
    #[error("startup failed: {message}")]
    Startup {
        /// What went wrong.
        message: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NoBots => "runtime_no_bots",
            RuntimeError::AllBotsStopped => "runtime_all_bots_stopped",
            RuntimeError::Startup { .. } => "runtime_startup_failed",
        }
    }
}
