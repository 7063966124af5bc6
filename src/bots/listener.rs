use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::BotError;
use crate::payload::Payload;

/// Shared reference to a listener.
pub type ListenerRef = Arc<dyn Listener>;

/// Event source of a bot.
///
/// A listener owns the connection to the outside world (a chat server,
/// a socket, a message queue) and turns whatever arrives there into
/// [`Payload`] events pushed through the [`EventSink`]. It runs on its
/// own task and must watch the cancellation token: when the token fires
/// the listener is expected to wind down and return.
///
/// ## Rules
/// - Return `Err(BotError::Cancelled)` after the token fires.
/// - Returning any other error restarts the listener; the bot's error
///   monitor decides whether the restart loop gets throttled.
/// - Returning `Ok(())` ends the bot for good.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Listener name used in logs.
    fn name(&self) -> &str;

    /// Runs the listener until cancellation or failure.
    async fn run(&self, events: EventSink, ctx: CancellationToken) -> Result<(), BotError>;
}

/// Sending half of a bot's event queue.
///
/// Cloneable; `send` applies backpressure when the queue is full and
/// fails with [`BotError::Cancelled`] once the consuming side is gone.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Payload>,
}

impl EventSink {
    /// Creates a bounded queue and returns its two halves.
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Pushes one event, waiting while the queue is full.
    pub async fn send(&self, payload: Payload) -> Result<(), BotError> {
        self.tx.send(payload).await.map_err(|_| BotError::Cancelled)
    }

    /// True when the consuming side has shut down.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Function-backed [`Listener`] implementation.
///
/// Wraps an async closure so plain functions can act as listeners
/// without a dedicated struct:
///
/// ```rust
/// use botvisor::{EventSink, ListenerFn, ListenerRef, Payload};
/// use tokio_util::sync::CancellationToken;
///
/// let listener: ListenerRef = ListenerFn::arc("ticker", |events: EventSink, ctx: CancellationToken| async move {
///     loop {
///         tokio::select! {
///             _ = ctx.cancelled() => return Err(botvisor::BotError::Cancelled),
///             _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {
///                 events.send(Payload::new().with("message", "tick")).await?;
///             }
///         }
///     }
/// });
/// # let _ = listener;
/// ```
pub struct ListenerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ListenerFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Listener for ListenerFn<F>
where
    F: Fn(EventSink, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BotError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, events: EventSink, ctx: CancellationToken) -> Result<(), BotError> {
        (self.f)(events, ctx).await
    }
}

/// Listener for bots that only run scheduled tasks.
///
/// Emits nothing and parks until cancelled, so the bot stays alive for
/// its tasks without a real event source.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubListener;

#[async_trait]
impl Listener for StubListener {
    fn name(&self) -> &str {
        "stub"
    }

    async fn run(&self, _events: EventSink, ctx: CancellationToken) -> Result<(), BotError> {
        ctx.cancelled().await;
        Err(BotError::Cancelled)
    }
}
