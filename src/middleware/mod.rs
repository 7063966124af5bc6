//! # Event-processing pipeline.
//!
//! Every bot feeds its events through an ordered stage chain. Each
//! stage may rewrite the frame, short-circuit with a reply, or pass
//! control on; the terminal stage invokes the selected handler.
//!
//! ## Architecture
//! ```text
//! Default chain of a command-routing bot:
//!
//!   payload ──► CatchErrors ─► LoadContext ─► BuildChat ─► RouteCommand ─► (user stages) ─► Invoke
//!                   │                             │             │                             │
//!                   │ logs and swallows           │ attaches    │ unknown / forbidden         │ resolves args,
//!                   │ non-control errors          │ Chat        │ replies short-circuit       │ calls handler
//! ```
//!
//! ## Rules
//! - Stages run in registration order; `Invoke` is always last.
//! - Control errors ([`crate::BotError::is_control`]) always reach the
//!   runtime untouched.
//! - A custom chain replaces everything, built-ins included.

mod chain;
mod stages;

pub use chain::{Chain, Frame, Middleware, MiddlewareRef, Next, RunContext};
pub use stages::{BuildChat, CatchErrors, Invoke, LoadContext, RouteCommand};
