use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::bots::{Bot, HandlerRef};
use crate::chat::Chat;
use crate::error::BotError;
use crate::payload::Payload;
use crate::runtime::BotRegistry;

/// Shared reference to a pipeline stage.
pub type MiddlewareRef = Arc<dyn Middleware>;

/// One stage of a bot's processing pipeline.
///
/// A stage inspects or rewrites the [`Frame`] and either forwards it
/// with `next.run(..)` or short-circuits by returning a value itself.
///
/// ```rust
/// use async_trait::async_trait;
/// use botvisor::{BotError, Frame, Middleware, Next, RunContext};
/// use serde_json::Value;
///
/// struct Stamp;
///
/// #[async_trait]
/// impl Middleware for Stamp {
///     async fn handle(
///         &self,
///         run: &RunContext,
///         mut frame: Frame,
///         next: Next<'_>,
///     ) -> Result<Value, BotError> {
///         frame.payload.insert("stamped", true);
///         next.run(run, frame).await
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, run: &RunContext, frame: Frame, next: Next<'_>)
        -> Result<Value, BotError>;
}

/// Mutable state travelling through the pipeline for one event.
///
/// Starts as a bare payload; the built-in stages fill in the chat and
/// the routed handler along the way.
pub struct Frame {
    /// The event payload, rewritten as stages see fit.
    pub payload: Payload,
    /// Reply surface, present once the chat stage ran.
    pub chat: Option<Chat>,
    /// Handler picked by routing; [`Invoke`](super::Invoke) falls back
    /// to the bot's own handler when empty.
    pub handler: Option<HandlerRef>,
    /// Matched command text, if routing matched one.
    pub command: Option<Arc<str>>,
}

impl Frame {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            chat: None,
            handler: None,
            command: None,
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("payload", &self.payload)
            .field("chat", &self.chat.is_some())
            .field("handler", &self.handler.is_some())
            .field("command", &self.command)
            .finish()
    }
}

/// Immutable surroundings of a pipeline run.
#[derive(Clone)]
pub struct RunContext {
    /// The bot whose pipeline is running.
    pub bot: Arc<Bot>,
    /// Registry of all bots in the application.
    pub registry: Arc<BotRegistry>,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("bot", &self.bot.name())
            .finish()
    }
}

/// Remainder of the pipeline after the current stage.
pub struct Next<'a> {
    rest: &'a [MiddlewareRef],
}

impl Next<'_> {
    /// Runs the remaining stages; an exhausted pipeline yields `Null`.
    pub async fn run(self, run: &RunContext, frame: Frame) -> Result<Value, BotError> {
        match self.rest.split_first() {
            Some((stage, rest)) => stage.handle(run, frame, Next { rest }).await,
            None => Ok(Value::Null),
        }
    }
}

/// Immutable, cheaply cloneable stage sequence of one bot.
#[derive(Clone)]
pub struct Chain {
    stages: Arc<[MiddlewareRef]>,
}

impl Chain {
    pub fn new(stages: Vec<MiddlewareRef>) -> Self {
        Self {
            stages: stages.into(),
        }
    }

    /// Number of stages.
    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Feeds one payload through the pipeline.
    pub async fn run(&self, run: &RunContext, payload: Payload) -> Result<Value, BotError> {
        Next { rest: &self.stages }.run(run, Frame::new(payload)).await
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("stages", &self.len()).finish()
    }
}
