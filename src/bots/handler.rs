use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::chat::Chat;
use crate::error::BotError;
use crate::logging::LoggerRef;
use crate::payload::Payload;
use crate::runtime::BotRegistry;

/// Shared reference to a handler.
pub type HandlerRef = Arc<dyn Handler>;

/// Unit of bot logic invoked with resolved arguments.
///
/// Handlers back chat commands, default message processing and
/// scheduled tasks alike. The pipeline resolves `params()` through the
/// bot's providers before the call, so the handler receives exactly the
/// arguments it asked for.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Argument names this handler wants resolved.
    fn params(&self) -> &[String];

    /// Runs the handler.
    async fn call(&self, ctx: HandlerContext, args: Payload) -> Result<Value, BotError>;
}

/// Per-invocation environment handed to every handler.
///
/// `chat` and `command` are present only when the invocation came
/// through the chat pipeline; task invocations leave them empty.
#[derive(Clone)]
pub struct HandlerContext {
    /// Name of the bot this handler runs under.
    pub bot: Arc<str>,
    /// The bot's logger.
    pub logger: LoggerRef,
    /// Registry for starting and stopping sibling bots.
    pub registry: Arc<BotRegistry>,
    /// Reply surface for the message being handled, if any.
    pub chat: Option<Chat>,
    /// Matched command text, if any.
    pub command: Option<Arc<str>>,
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("bot", &self.bot)
            .field("chat", &self.chat.is_some())
            .field("command", &self.command)
            .finish()
    }
}

/// Function-backed [`Handler`] implementation.
///
/// ```rust
/// use botvisor::{HandlerContext, HandlerFn, HandlerRef, Payload};
/// use serde_json::Value;
///
/// let echo: HandlerRef = HandlerFn::arc(&["message"], |ctx: HandlerContext, args: Payload| async move {
///     let text = args.str("message").unwrap_or_default().to_string();
///     if let Some(chat) = ctx.chat.as_ref() {
///         chat.reply(&text).await?;
///     }
///     Ok(Value::Null)
/// });
/// assert_eq!(echo.params(), ["message"]);
/// ```
pub struct HandlerFn<F> {
    params: Vec<String>,
    f: F,
}

impl<F> HandlerFn<F> {
    pub fn new(params: &[&str], f: F) -> Self {
        Self {
            params: params.iter().map(|p| p.to_string()).collect(),
            f,
        }
    }

    pub fn arc(params: &[&str], f: F) -> Arc<Self> {
        Arc::new(Self::new(params, f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(HandlerContext, Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BotError>> + Send + 'static,
{
    fn params(&self) -> &[String] {
        &self.params
    }

    async fn call(&self, ctx: HandlerContext, args: Payload) -> Result<Value, BotError> {
        (self.f)(ctx, args).await
    }
}
