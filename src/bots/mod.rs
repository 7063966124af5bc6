//! # Bot abstractions and assembly.
//!
//! This module provides the unit the runtime supervises:
//! - [`Bot`] - event source, pipeline, tasks and identity in one place
//! - [`BotBuilder`] - fluent, validating constructor
//! - [`Listener`] / [`ListenerFn`] / [`StubListener`] - event sources
//! - [`EventSink`] - bounded queue a listener pushes payloads into
//! - [`Handler`] / [`HandlerFn`] - invocable bot logic
//! - [`HandlerContext`] - per-invocation environment

mod bot;
mod builder;
mod handler;
mod listener;

pub use bot::{Bot, HookFn};
pub use builder::BotBuilder;
pub use handler::{Handler, HandlerContext, HandlerFn, HandlerRef};
pub use listener::{EventSink, Listener, ListenerFn, ListenerRef, StubListener};
