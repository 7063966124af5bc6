//! # Chat reply surface.
//!
//! A [`Chat`] is built per incoming message by the chat stages and handed
//! to the handler: who sent the message, the raw text, and reply helpers
//! wired to the bot's sender with the bot's configured texts.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::BotError;
use crate::logging::LoggerRef;

/// Async delivery of a reply: `(message, recipient)` to the transport.
pub type SenderFn =
    Arc<dyn Fn(String, String) -> BoxFuture<'static, Result<Value, BotError>> + Send + Sync>;

/// Reply texts for the built-in response paths.
#[derive(Clone, Debug)]
pub struct ChatTexts {
    /// Sent by [`Chat::error`].
    pub error: String,
    /// Sent by [`Chat::unknown_command`].
    pub unknown: String,
    /// Sent by [`Chat::refuse`].
    pub refuse: String,
}

impl Default for ChatTexts {
    fn default() -> Self {
        Self {
            error: "Error occurred".to_string(),
            unknown: "Unknown command".to_string(),
            refuse: "Access forbidden".to_string(),
        }
    }
}

/// One incoming chat message with its reply channel.
#[derive(Clone)]
pub struct Chat {
    /// Who sent the message.
    pub sender: String,
    /// The raw message text, before command extraction.
    pub message: String,
    send: SenderFn,
    logger: LoggerRef,
    texts: Arc<ChatTexts>,
}

impl Chat {
    pub(crate) fn new(
        sender: String,
        message: String,
        send: SenderFn,
        logger: LoggerRef,
        texts: Arc<ChatTexts>,
    ) -> Self {
        Self {
            sender,
            message,
            send,
            logger,
            texts,
        }
    }

    /// Sends `message` back to the sender.
    pub async fn reply(&self, message: &str) -> Result<Value, BotError> {
        (self.send)(message.to_string(), self.sender.clone()).await
    }

    /// Informs the sender an internal error occurred.
    pub async fn error(&self) -> Result<Value, BotError> {
        self.logger
            .error(&format!(
                "error in the bot; sender: {}, message: {}",
                self.sender, self.message
            ))
            .await;
        self.reply(&self.texts.error).await
    }

    /// Warns the sender their message matched no command.
    pub async fn unknown_command(&self) -> Result<Value, BotError> {
        self.logger.info(&format!(
            "{} sent unknown command: {}",
            self.sender, self.message
        ));
        self.reply(&self.texts.unknown).await
    }

    /// Tells the sender they may not use this command.
    pub async fn refuse(&self) -> Result<Value, BotError> {
        self.logger.info(&format!(
            "forbidden; sender: {}, message: {}",
            self.sender, self.message
        ));
        self.reply(&self.texts.refuse).await
    }
}

impl std::fmt::Debug for Chat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chat")
            .field("sender", &self.sender)
            .field("message", &self.message)
            .finish()
    }
}
