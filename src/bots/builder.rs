use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use rand::Rng;
use serde_json::Value;

use crate::chat::{ChatTexts, Command, CommandTrie, SenderFn};
use crate::error::{BotError, BuildError};
use crate::inject::Providers;
use crate::logging::{ConsoleLoggerFactory, LoggerFactory};
use crate::middleware::{
    BuildChat, CatchErrors, Chain, Invoke, LoadContext, Middleware, MiddlewareRef, RouteCommand,
};
use crate::payload::Payload;
use crate::scheduler::TaskInfo;

use super::bot::{Bot, HookFn};
use super::handler::HandlerRef;
use super::listener::{ListenerRef, StubListener};

/// Fluent constructor for [`Bot`].
///
/// ```rust
/// use std::sync::Arc;
///
/// use botvisor::{Bot, Command, HandlerFn, Payload, StubListener};
/// use serde_json::Value;
///
/// let bot = Bot::builder("greeter")
///     .with_listener(Arc::new(StubListener))
///     .with_sender(|message: String, user: String| async move {
///         println!("-> {user}: {message}");
///         Ok(Value::Null)
///     })
///     .with_command(Command::new("hello", HandlerFn::arc(&[], |ctx, _args: Payload| async move {
///         if let Some(chat) = ctx.chat.as_ref() {
///             chat.reply("hi there").await?;
///         }
///         Ok(Value::Null)
///     })))
///     .build()
///     .unwrap();
/// assert_eq!(bot.name(), "greeter");
/// ```
pub struct BotBuilder {
    name: String,
    listener: Option<ListenerRef>,
    handler: Option<HandlerRef>,
    commands: Vec<Command>,
    sender: Option<SenderFn>,
    middlewares: Vec<MiddlewareRef>,
    chain: Option<Vec<MiddlewareRef>>,
    providers: Providers,
    tasks: Vec<TaskInfo>,
    run_at_start: bool,
    logger_factory: Option<Arc<dyn LoggerFactory>>,
    texts: ChatTexts,
    admin: Option<String>,
    before_start: Option<HookFn>,
    before_close: Option<HookFn>,
}

impl BotBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listener: None,
            handler: None,
            commands: Vec::new(),
            sender: None,
            middlewares: Vec::new(),
            chain: None,
            providers: Providers::new(),
            tasks: Vec::new(),
            run_at_start: true,
            logger_factory: None,
            texts: ChatTexts::default(),
            admin: None,
            before_start: None,
            before_close: None,
        }
    }

    /// Event source of the bot.
    pub fn with_listener(mut self, listener: ListenerRef) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Handler for bots that process raw events without command routing.
    pub fn with_handler(mut self, handler: HandlerRef) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Adds one chat command; command routing is enabled once any
    /// command is present.
    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Outgoing message function used by [`crate::Chat`] replies.
    ///
    /// Called with `(message, recipient)`: the text to deliver and the user
    /// it goes to.
    pub fn with_sender<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BotError>> + Send + 'static,
    {
        let send: SenderFn = Arc::new(
            move |message: String, user: String| -> BoxFuture<'static, Result<Value, BotError>> {
                Box::pin(f(message, user))
            },
        );
        self.sender = Some(send);
        self
    }

    /// Appends a custom stage between routing and invocation.
    pub fn with_middleware(mut self, stage: impl Middleware) -> Self {
        self.middlewares.push(Arc::new(stage));
        self
    }

    /// Replaces the whole pipeline; the bot runs exactly these stages.
    pub fn with_chain(mut self, stages: Vec<MiddlewareRef>) -> Self {
        self.chain = Some(stages);
        self
    }

    /// Registers an argument provider.
    pub fn with_provider<F>(mut self, name: impl Into<String>, params: &[&str], f: F) -> Self
    where
        F: Fn(&Payload) -> Result<Value, BotError> + Send + Sync + 'static,
    {
        self.providers.register(name, params, f);
        self
    }

    /// Registers a constant provider value.
    pub fn with_provider_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.providers.register_value(name, value);
        self
    }

    /// Replaces the provider set wholesale.
    pub fn with_providers(mut self, providers: Providers) -> Self {
        self.providers = providers;
        self
    }

    /// Adds a scheduled task owned by this bot.
    pub fn with_task(mut self, task: TaskInfo) -> Self {
        self.tasks.push(task);
        self
    }

    /// Whether the runtime launches this bot on startup. Defaults to
    /// `true`; disabled bots wait for an explicit start request.
    pub fn with_run_at_start(mut self, run_at_start: bool) -> Self {
        self.run_at_start = run_at_start;
        self
    }

    /// Admin user name; required by [`Command::admin_only`] and used as
    /// the destination for admin reports.
    pub fn with_admin(mut self, admin: impl Into<String>) -> Self {
        self.admin = Some(admin.into());
        self
    }

    /// Overrides the canned chat reply texts.
    pub fn with_texts(mut self, texts: ChatTexts) -> Self {
        self.texts = texts;
        self
    }

    pub fn with_logger_factory(mut self, factory: Arc<dyn LoggerFactory>) -> Self {
        self.logger_factory = Some(factory);
        self
    }

    /// Hook run before the bot starts listening.
    pub fn with_before_start<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let hook: HookFn = Arc::new(move || -> BoxFuture<'static, Result<(), BotError>> {
            Box::pin(f())
        });
        self.before_start = Some(hook);
        self
    }

    /// Hook run when the application shuts the bot down.
    pub fn with_before_close<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        let hook: HookFn = Arc::new(move || -> BoxFuture<'static, Result<(), BotError>> {
            Box::pin(f())
        });
        self.before_close = Some(hook);
        self
    }

    /// Validates the configuration and assembles the bot.
    pub fn build(self) -> Result<Bot, BuildError> {
        let name = if self.name.trim().is_empty() {
            generated_name()
        } else {
            self.name
        };

        // A bot must either listen for events or carry tasks. Task-only
        // bots get a stub listener that parks until cancellation.
        let (listener, listens): (ListenerRef, bool) = match self.listener {
            Some(listener) => (listener, true),
            None if !self.tasks.is_empty() => (Arc::new(StubListener), false),
            None => {
                return Err(BuildError::MissingListener { bot: name });
            }
        };

        if listens && self.handler.is_none() && self.commands.is_empty() {
            return Err(BuildError::MissingHandler { bot: name });
        }
        if !self.commands.is_empty() && self.sender.is_none() {
            return Err(BuildError::MissingSender { bot: name });
        }

        let mut seen = HashSet::new();
        for command in &self.commands {
            if !seen.insert(command.command().to_lowercase()) {
                return Err(BuildError::DuplicateCommand {
                    command: command.command().to_string(),
                });
            }
        }

        let mut task_names = HashSet::new();
        for task in &self.tasks {
            if task.triggers().is_empty() {
                return Err(BuildError::NoTriggers {
                    task: task.name().to_string(),
                });
            }
            if !task_names.insert(task.name().to_string()) {
                return Err(BuildError::DuplicateTask {
                    name: task.name().to_string(),
                });
            }
        }

        let router = if self.commands.is_empty() {
            None
        } else {
            let mut trie = CommandTrie::new();
            for command in self.commands {
                let compiled = command.compile(self.admin.as_deref())?;
                trie.insert(Arc::new(compiled));
            }
            Some(trie)
        };

        let factory = self
            .logger_factory
            .unwrap_or_else(|| Arc::new(ConsoleLoggerFactory));
        let logger = factory.for_bot(&name);

        let chain = match self.chain {
            Some(stages) => Chain::new(stages),
            None => {
                let mut stages: Vec<MiddlewareRef> =
                    vec![Arc::new(CatchErrors), Arc::new(LoadContext)];
                if router.is_some() {
                    stages.push(Arc::new(BuildChat));
                    stages.push(Arc::new(RouteCommand));
                }
                stages.extend(self.middlewares);
                stages.push(Arc::new(Invoke));
                Chain::new(stages)
            }
        };

        Ok(Bot::new(
            name,
            listener,
            self.handler,
            router,
            self.sender,
            chain,
            self.providers,
            self.tasks,
            self.run_at_start,
            logger,
            self.texts,
            self.admin,
            self.before_start,
            self.before_close,
        ))
    }
}

/// Random lowercase alphanumeric name for bots declared without one.
fn generated_name() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..7)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::handler::HandlerFn;
    use crate::bots::listener::ListenerFn;
    use crate::scheduler::PeriodTrigger;
    use tokio_util::sync::CancellationToken;

    fn noop_handler() -> HandlerRef {
        HandlerFn::arc(&[], |_ctx, _args| async { Ok(Value::Null) })
    }

    fn idle_listener() -> ListenerRef {
        ListenerFn::arc("idle", |_events, ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(BotError::Cancelled)
        })
    }

    #[test]
    fn listener_without_handler_is_rejected() {
        let err = Bot::builder("b").with_listener(idle_listener()).build();
        assert!(matches!(err, Err(BuildError::MissingHandler { .. })));
    }

    #[test]
    fn commands_without_sender_are_rejected() {
        let err = Bot::builder("b")
            .with_listener(idle_listener())
            .with_command(Command::new("ping", noop_handler()))
            .build();
        assert!(matches!(err, Err(BuildError::MissingSender { .. })));
    }

    #[test]
    fn bot_without_listener_or_tasks_is_rejected() {
        let err = Bot::builder("b").build();
        assert!(matches!(err, Err(BuildError::MissingListener { .. })));
    }

    #[test]
    fn task_only_bot_gets_stub_listener() {
        let bot = Bot::builder("cron")
            .with_task(TaskInfo::new(
                "tick",
                noop_handler(),
                vec![Arc::new(PeriodTrigger::secs(5))],
            ))
            .build()
            .unwrap();
        assert_eq!(bot.tasks().len(), 1);
        assert!(bot.router().is_none());
    }

    #[test]
    fn duplicate_commands_differing_in_case_are_rejected() {
        let err = Bot::builder("b")
            .with_listener(idle_listener())
            .with_sender(|_, _| async { Ok(Value::Null) })
            .with_command(Command::new("Ping", noop_handler()))
            .with_command(Command::new("ping", noop_handler()))
            .build();
        assert!(matches!(err, Err(BuildError::DuplicateCommand { .. })));
    }

    #[test]
    fn admin_only_command_requires_admin() {
        let err = Bot::builder("b")
            .with_listener(idle_listener())
            .with_sender(|_, _| async { Ok(Value::Null) })
            .with_command(Command::new("wipe", noop_handler()).admin_only())
            .build();
        assert!(matches!(err, Err(BuildError::NoAdmin { .. })));
    }

    #[test]
    fn empty_name_is_generated() {
        let bot = Bot::builder("")
            .with_listener(idle_listener())
            .with_handler(noop_handler())
            .build()
            .unwrap();
        assert_eq!(bot.name().len(), 7);
    }
}
