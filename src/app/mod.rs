//! Application assembly.
//!
//! The top of the crate: [`BotApp`] collects built bots, applies the checks
//! that span bots (unique names, unique task names, the reserved scheduler
//! name), and produces an [`AppContainer`] that the runtime supervises.
//!
//! Internal modules:
//! - `app`: the [`BotApp`] builder and its run entry points;
//! - `container`: the assembled bot set, root logger, and scheduler.

#[allow(clippy::module_inception)]
mod app;
mod container;

pub use app::BotApp;
pub use container::AppContainer;
