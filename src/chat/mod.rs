//! # Chat-command routing.
//!
//! Turns free-form chat messages into handler invocations:
//!
//! - [`Command`]: a command declaration (text, handler, allow/deny lists),
//!   compiled at build time into a [`CompiledCommand`] with an anchored
//!   case-insensitive pattern.
//! - [`CommandTrie`]: prefix tree resolving the most specific command for
//!   a message, with fallback to shorter prefixes.
//! - [`Chat`]: the reply surface handed to handlers of chat bots.
//!
//! ## Matching
//! ```text
//!   "apple cranberry pie"
//!        │ descend trie on the lower-cased message,
//!        │ collecting every terminal passed: ["", "apple", "apple cranberry"]
//!        ▼
//!   try longest first against the RAW message:
//!     "apple cranberry"  ~ ^apple cranberry(?:\s+(.*))?$   → args "pie"
//! ```

#[allow(clippy::module_inception)]
mod chat;
mod command;
mod trie;

pub use chat::{Chat, ChatTexts, SenderFn};
pub use command::{is_user_allowed, Command, CompiledCommand};
pub use trie::CommandTrie;
