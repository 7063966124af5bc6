//! # Command declaration and compilation.
//!
//! A [`Command`] binds a literal command text to a handler, optionally
//! restricted to an allow list or fenced by a deny list. At build time it
//! compiles into a [`CompiledCommand`]: an anchored, case-insensitive,
//! dot-matches-newline pattern with an optional trailing
//! whitespace-plus-arguments group.
//!
//! The empty command text is the catch-all: its pattern matches any message
//! with the whole message captured as the arguments.

use regex::Regex;

use crate::bots::HandlerRef;
use crate::error::BuildError;

/// A declared chat command; compiled by the builder.
pub struct Command {
    command: String,
    handler: HandlerRef,
    allow: Option<Vec<String>>,
    deny: Option<Vec<String>>,
    admin_only: bool,
}

impl Command {
    /// Declares `command` as fired by `handler`.
    ///
    /// `"add note"` fires on `"add note milk, eggs"` with arguments
    /// `"milk, eggs"`. The empty string declares the catch-all handler.
    pub fn new(command: impl Into<String>, handler: HandlerRef) -> Self {
        Self {
            command: command.into(),
            handler,
            allow: None,
            deny: None,
            admin_only: false,
        }
    }

    /// Restricts the command to these users (identity is case-insensitive).
    pub fn allow<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow = Some(users.into_iter().map(casefold).collect());
        self
    }

    /// Rejects these users even when also allow-listed.
    pub fn deny<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny = Some(users.into_iter().map(casefold).collect());
        self
    }

    /// Restricts the command to the bot's configured admin.
    ///
    /// Overrides any allow list; the deny list still applies.
    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    /// The declared command text.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub(crate) fn compile(self, admin: Option<&str>) -> Result<CompiledCommand, BuildError> {
        let allow = if self.admin_only {
            let admin = admin.ok_or_else(|| BuildError::NoAdmin {
                command: self.command.clone(),
            })?;
            Some(vec![admin.to_lowercase()])
        } else {
            self.allow
        };

        let source = if self.command.is_empty() {
            "(?is)^(.*)$".to_string()
        } else {
            format!("(?is)^{}(?:\\s+(.*))?$", regex::escape(&self.command))
        };
        let pattern = Regex::new(&source).map_err(|e| BuildError::BadPattern {
            command: self.command.clone(),
            message: e.to_string(),
        })?;

        Ok(CompiledCommand {
            command: self.command,
            handler: self.handler,
            pattern,
            allow,
            deny: self.deny,
        })
    }
}

/// A command ready for matching: pattern compiled, user lists casefolded.
pub struct CompiledCommand {
    command: String,
    handler: HandlerRef,
    pattern: Regex,
    allow: Option<Vec<String>>,
    deny: Option<Vec<String>>,
}

impl CompiledCommand {
    /// The declared command text (original casing).
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The handler this command fires.
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Fully matches `message` against the compiled pattern.
    ///
    /// Returns the captured arguments (empty when the message is exactly
    /// the command) or `None` when the pattern does not cover the whole
    /// message.
    pub fn match_message(&self, message: &str) -> Option<String> {
        let caps = self.pattern.captures(message)?;
        Some(
            caps.get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        )
    }

    /// Whether `user` may fire this command (see [`is_user_allowed`]).
    pub fn is_user_allowed(&self, user: &str) -> bool {
        is_user_allowed(user, self.allow.as_deref(), self.deny.as_deref())
    }
}

impl std::fmt::Debug for CompiledCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledCommand")
            .field("command", &self.command)
            .field("allow", &self.allow)
            .field("deny", &self.deny)
            .finish()
    }
}

fn casefold(s: impl Into<String>) -> String {
    s.into().to_lowercase()
}

/// Case-insensitive user authorization.
///
/// A deny-list entry always rejects, even for users also allow-listed; an
/// allow list with no match rejects; absence of both lists allows everyone.
/// The lists are expected casefolded (compilation does this).
pub fn is_user_allowed(user: &str, allow: Option<&[String]>, deny: Option<&[String]>) -> bool {
    let user = user.to_lowercase();
    if let Some(deny) = deny {
        if deny.iter().any(|u| *u == user) {
            return false;
        }
    }
    if let Some(allow) = allow {
        return allow.iter().any(|u| *u == user);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::HandlerFn;
    use serde_json::json;

    fn handler() -> HandlerRef {
        HandlerFn::arc(&[], |_ctx, _args| async { Ok(json!(null)) })
    }

    fn folded(users: &[&str]) -> Vec<String> {
        users.iter().map(|u| u.to_lowercase()).collect()
    }

    #[test]
    fn deny_overrides_allow() {
        let allow = folded(&["Alice", "Bob"]);
        let deny = folded(&["bob"]);
        assert!(is_user_allowed("alice", Some(&allow), Some(&deny)));
        assert!(!is_user_allowed("BOB", Some(&allow), Some(&deny)));
    }

    #[test]
    fn allow_list_without_match_rejects() {
        let allow = folded(&["alice"]);
        assert!(!is_user_allowed("mallory", Some(&allow), None));
        assert!(is_user_allowed("ALICE", Some(&allow), None));
    }

    #[test]
    fn no_lists_allows_everyone() {
        assert!(is_user_allowed("anyone", None, None));
    }

    #[test]
    fn pattern_requires_word_boundary() {
        let cmd = Command::new("add note", handler()).compile(None).unwrap();
        assert_eq!(
            cmd.match_message("ADD NOTE milk, eggs").as_deref(),
            Some("milk, eggs")
        );
        assert_eq!(cmd.match_message("add note").as_deref(), Some(""));
        assert_eq!(cmd.match_message("add notes"), None);
    }

    #[test]
    fn arguments_keep_raw_casing_and_newlines() {
        let cmd = Command::new("echo", handler()).compile(None).unwrap();
        assert_eq!(
            cmd.match_message("Echo First\nSecond").as_deref(),
            Some("First\nSecond")
        );
    }

    #[test]
    fn catch_all_matches_everything() {
        let cmd = Command::new("", handler()).compile(None).unwrap();
        assert_eq!(
            cmd.match_message("anything at all").as_deref(),
            Some("anything at all")
        );
    }

    #[test]
    fn admin_only_requires_admin() {
        let missing = Command::new("stop", handler()).admin_only().compile(None);
        assert!(matches!(missing, Err(BuildError::NoAdmin { .. })));

        let cmd = Command::new("stop", handler())
            .admin_only()
            .compile(Some("Boss"))
            .unwrap();
        assert!(cmd.is_user_allowed("boss"));
        assert!(!cmd.is_user_allowed("intern"));
    }
}
