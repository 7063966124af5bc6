use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::BotError;

/// Why [`BotRegistry::start`] refused a request.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRefusal {
    /// The target bot is already running.
    #[error("bot is already running")]
    AlreadyRunning,

    /// No bot with this name exists in the application.
    #[error("no bot with this name exists")]
    Unknown,
}

/// Directory of every bot in the application and its run state.
///
/// Handed to handlers through their context so chat commands can
/// inspect, stop and start sibling bots. Names are matched
/// case-insensitively; the registry always answers with the canonical
/// spelling the bot was registered under.
#[derive(Debug)]
pub struct BotRegistry {
    names: Vec<String>,
    running: RwLock<HashMap<String, CancellationToken>>,
}

impl BotRegistry {
    pub(crate) fn new(names: Vec<String>) -> Self {
        Self {
            names,
            running: RwLock::new(HashMap::new()),
        }
    }

    /// Canonical names of all bots, running or not.
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Canonical spelling for a case-insensitive name, if the bot exists.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        let wanted = name.to_lowercase();
        self.names
            .iter()
            .find(|n| n.to_lowercase() == wanted)
            .map(String::as_str)
    }

    /// Sorted names of the currently running bots.
    pub async fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.running.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of the bots that are not running right now.
    pub async fn stopped(&self) -> Vec<String> {
        let running = self.running.read().await;
        self.names
            .iter()
            .filter(|n| !running.contains_key(*n))
            .cloned()
            .collect()
    }

    pub async fn is_running(&self, name: &str) -> bool {
        match self.canonical(name) {
            Some(canonical) => self.running.read().await.contains_key(canonical),
            None => false,
        }
    }

    /// Requests cancellation of a running bot.
    ///
    /// Returns `false` when the bot does not exist or is not running.
    /// The bot stays listed as running until the runtime observes its
    /// exit.
    pub async fn stop(&self, name: &str) -> bool {
        let Some(canonical) = self.canonical(name) else {
            return false;
        };
        match self.running.read().await.get(canonical) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Validates a start request and mints the control signal for it.
    ///
    /// Starting happens in the runtime, so the caller must hand the
    /// returned error back up the pipeline:
    ///
    /// ```rust,no_run
    /// # async fn example(ctx: botvisor::HandlerContext) -> Result<serde_json::Value, botvisor::BotError> {
    /// match ctx.registry.start("worker").await {
    ///     Ok(signal) => return Err(signal),
    ///     Err(refusal) => ctx.logger.warn(&format!("start refused: {refusal}")),
    /// }
    /// # Ok(serde_json::Value::Null)
    /// # }
    /// ```
    pub async fn start(&self, name: &str) -> Result<BotError, StartRefusal> {
        let canonical = self.canonical(name).ok_or(StartRefusal::Unknown)?;
        if self.running.read().await.contains_key(canonical) {
            return Err(StartRefusal::AlreadyRunning);
        }
        Ok(BotError::start_bot(canonical))
    }

    pub(crate) async fn insert_running(&self, name: &str, token: CancellationToken) {
        self.running.write().await.insert(name.to_string(), token);
    }

    pub(crate) async fn mark_stopped(&self, name: &str) {
        self.running.write().await.remove(name);
    }

    pub(crate) async fn running_tokens(&self) -> Vec<(String, CancellationToken)> {
        self.running
            .read()
            .await
            .iter()
            .map(|(name, token)| (name.clone(), token.clone()))
            .collect()
    }
}
