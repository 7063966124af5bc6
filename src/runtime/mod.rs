//! # Supervision runtime.
//!
//! This module owns everything that runs: the supervisor loop, the
//! per-bot actor (listener pump), the error-rate monitor, the bot
//! registry, and OS signal handling.
//!
//! ## Architecture
//! ```text
//!                  ┌─────────────────────────────┐
//!                  │          Supervisor         │
//!                  │   JoinSet: one unit per bot │
//!                  │   + the scheduler unit      │
//!                  └───────┬─────────────┬───────┘
//!            child token   │             │   child token
//!                          ▼             ▼
//!                      BotActor        Scheduler ("__sched__")
//!                       │    ▲
//!       spawns listener │    │ payloads (bounded mpsc)
//!                       ▼    │
//!                      Listener ──► EventSink
//! ```
//!
//! ## Rules
//! - Units fail independently; one bot's crash never touches its
//!   siblings.
//! - Exit verdicts are classified, not propagated: restart requests
//!   respawn, exit requests retire the bot, an application exit winds
//!   everything down through the hooks.
//! - The registry is the single source of run-state truth; `stop` is a
//!   cancellation request, a bot counts as stopped only once its unit
//!   actually exits.

mod actor;
mod monitor;
mod registry;
mod shutdown;
mod supervisor;

pub use monitor::ErrorRateMonitor;
pub use registry::{BotRegistry, StartRefusal};
pub use shutdown::wait_for_shutdown_signal;

pub(crate) use supervisor::{Supervisor, SCHEDULER_UNIT};
