use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::chat::{Chat, ChatTexts, CommandTrie, SenderFn};
use crate::error::BotError;
use crate::inject::Providers;
use crate::logging::LoggerRef;
use crate::middleware::Chain;
use crate::scheduler::TaskInfo;

use super::builder::BotBuilder;
use super::handler::HandlerRef;
use super::listener::ListenerRef;

/// Boxed async lifecycle hook.
pub type HookFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), BotError>> + Send + Sync>;

/// One unit of the application: event source, processing pipeline and
/// scheduled tasks under a single name.
///
/// Bots are assembled through [`BotBuilder`] and are immutable after
/// `build()`, except for the enabled flag which the runtime flips when
/// the bot is stopped or started.
pub struct Bot {
    name: Arc<str>,
    listener: ListenerRef,
    handler: Option<HandlerRef>,
    router: Option<CommandTrie>,
    sender: Option<SenderFn>,
    chain: Chain,
    providers: Providers,
    tasks: Vec<TaskInfo>,
    run_at_start: bool,
    enabled: AtomicBool,
    logger: LoggerRef,
    texts: Arc<ChatTexts>,
    admin: Option<String>,
    before_start: Option<HookFn>,
    before_close: Option<HookFn>,
}

impl Bot {
    /// Starts building a bot with the given name.
    ///
    /// An empty name gets replaced with a generated one at `build()`.
    pub fn builder(name: impl Into<String>) -> BotBuilder {
        BotBuilder::new(name)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        listener: ListenerRef,
        handler: Option<HandlerRef>,
        router: Option<CommandTrie>,
        sender: Option<SenderFn>,
        chain: Chain,
        providers: Providers,
        tasks: Vec<TaskInfo>,
        run_at_start: bool,
        logger: LoggerRef,
        texts: ChatTexts,
        admin: Option<String>,
        before_start: Option<HookFn>,
        before_close: Option<HookFn>,
    ) -> Self {
        Self {
            name: name.into(),
            listener,
            handler,
            router,
            sender,
            chain,
            providers,
            tasks,
            run_at_start,
            enabled: AtomicBool::new(true),
            logger,
            texts: Arc::new(texts),
            admin,
            before_start,
            before_close,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    #[inline]
    pub fn logger(&self) -> &LoggerRef {
        &self.logger
    }

    #[inline]
    pub(crate) fn listener(&self) -> &ListenerRef {
        &self.listener
    }

    #[inline]
    pub fn handler(&self) -> Option<&HandlerRef> {
        self.handler.as_ref()
    }

    #[inline]
    pub fn router(&self) -> Option<&CommandTrie> {
        self.router.as_ref()
    }

    #[inline]
    pub(crate) fn chain(&self) -> &Chain {
        &self.chain
    }

    #[inline]
    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    #[inline]
    pub fn tasks(&self) -> &[TaskInfo] {
        &self.tasks
    }

    #[inline]
    pub fn run_at_start(&self) -> bool {
        self.run_at_start
    }

    #[inline]
    pub fn admin(&self) -> Option<&str> {
        self.admin.as_deref()
    }

    /// Whether the runtime currently lets this bot process events.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub(crate) fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Builds a reply surface for an incoming message.
    ///
    /// Returns `None` when the bot has no sender.
    pub(crate) fn make_chat(&self, sender: String, message: String) -> Option<Chat> {
        let send = self.sender.clone()?;
        Some(Chat::new(
            sender,
            message,
            send,
            self.logger.clone(),
            self.texts.clone(),
        ))
    }

    pub(crate) async fn run_before_start(&self) -> Result<(), BotError> {
        match self.before_start.as_ref() {
            Some(hook) => hook().await,
            None => Ok(()),
        }
    }

    pub(crate) async fn run_before_close(&self) -> Result<(), BotError> {
        match self.before_close.as_ref() {
            Some(hook) => hook().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("name", &self.name)
            .field("listener", &self.listener.name())
            .field("commands", &self.router.as_ref().map_or(0, |r| r.len()))
            .field("tasks", &self.tasks.len())
            .field("run_at_start", &self.run_at_start)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
