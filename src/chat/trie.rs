//! # Prefix tree over compiled commands.
//!
//! Commands are inserted lower-cased, character by character, each path
//! terminated by its [`CompiledCommand`]. Lookup walks the lower-cased
//! message once, collecting every terminal it passes (so `"apple"` and
//! `"apple cranberry"` are both candidates for `"apple cranberry pie"`),
//! then tries the candidates longest-first with a full pattern match
//! against the **raw** message. The walk finds prefixes cheaply; the
//! pattern match enforces the word boundary the walk cannot see
//! (`"applecherry"` passes the walk for `"apple"` but fails the pattern).
//!
//! The empty command terminates the root and is collected first, which by
//! the longest-first rule makes it the catch-all tried after everything
//! else has failed.

use std::collections::HashMap;
use std::sync::Arc;

use super::CompiledCommand;

#[derive(Default)]
struct Node {
    children: HashMap<char, Node>,
    terminal: Option<Arc<CompiledCommand>>,
}

/// Prefix tree resolving the most specific command for a message.
///
/// Built once per bot; read-only afterwards.
#[derive(Default)]
pub struct CommandTrie {
    root: Node,
    len: usize,
}

impl CommandTrie {
    /// Creates an empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a compiled command under its lower-cased text.
    ///
    /// A duplicate path replaces the previous terminal; the builder rejects
    /// duplicates before they get here.
    pub fn insert(&mut self, command: Arc<CompiledCommand>) {
        let mut node = &mut self.root;
        for ch in command.command().to_lowercase().chars() {
            node = node.children.entry(ch).or_default();
        }
        if node.terminal.replace(command).is_none() {
            self.len += 1;
        }
    }

    /// Number of inserted commands.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the trie holds no commands.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resolves the most specific command fully matching `message`.
    ///
    /// Returns the command and the extracted arguments (empty when the
    /// message is exactly the command). `None` is a valid outcome, not an
    /// error; the caller falls back to its unknown-command path.
    pub fn find_best_match(&self, message: &str) -> Option<(Arc<CompiledCommand>, String)> {
        let walk = message.to_lowercase();

        let mut candidates: Vec<&Arc<CompiledCommand>> = Vec::new();
        if let Some(t) = &self.root.terminal {
            candidates.push(t);
        }
        let mut node = &self.root;
        for ch in walk.chars() {
            match node.children.get(&ch) {
                Some(next) => {
                    node = next;
                    if let Some(t) = &node.terminal {
                        candidates.push(t);
                    }
                }
                None => break,
            }
        }

        for command in candidates.into_iter().rev() {
            if let Some(args) = command.match_message(message) {
                return Some((Arc::clone(command), args));
            }
        }
        None
    }
}

impl std::fmt::Debug for CommandTrie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTrie").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::{HandlerFn, HandlerRef};
    use crate::chat::Command;
    use serde_json::json;

    fn handler(tag: &str) -> HandlerRef {
        let tag = json!(tag);
        HandlerFn::arc(&[], move |_ctx, _args| {
            let tag = tag.clone();
            async move { Ok(tag) }
        })
    }

    fn trie_of(commands: &[&str]) -> CommandTrie {
        let mut trie = CommandTrie::new();
        for text in commands {
            let compiled = Command::new(*text, handler(text)).compile(None).unwrap();
            trie.insert(Arc::new(compiled));
        }
        trie
    }

    fn best(trie: &CommandTrie, message: &str) -> Option<(String, String)> {
        trie.find_best_match(message)
            .map(|(cmd, args)| (cmd.command().to_string(), args))
    }

    #[test]
    fn exact_match_returns_the_command_itself() {
        let trie = trie_of(&["apple", "cranberry", "apple cranberry"]);
        assert_eq!(best(&trie, "apple"), Some(("apple".into(), "".into())));
        assert_eq!(
            best(&trie, "cranberry"),
            Some(("cranberry".into(), "".into()))
        );
        assert_eq!(
            best(&trie, "apple cranberry"),
            Some(("apple cranberry".into(), "".into()))
        );
    }

    #[test]
    fn longer_command_is_preferred() {
        let trie = trie_of(&["apple", "apple cranberry"]);
        assert_eq!(
            best(&trie, "apple cranberry pie"),
            Some(("apple cranberry".into(), "pie".into()))
        );
    }

    #[test]
    fn diverging_suffix_falls_back_to_shorter_command() {
        let trie = trie_of(&["apple", "apple cranberry"]);
        // walk leaves the "apple cranberry" path at 'p'
        assert_eq!(
            best(&trie, "apple pear"),
            Some(("apple".into(), "pear".into()))
        );
        // walk passes the longer terminal but the boundary check fails
        assert_eq!(
            best(&trie, "apple cranberrycherry"),
            Some(("apple".into(), "cranberrycherry".into()))
        );
    }

    #[test]
    fn missing_word_boundary_is_no_match() {
        let trie = trie_of(&["apple", "apple cranberry"]);
        assert_eq!(best(&trie, "applecherry"), None);
    }

    #[test]
    fn partial_walk_with_matching_prefix_extracts_arguments() {
        let trie = trie_of(&["apple", "apple cranberry"]);
        assert_eq!(
            best(&trie, "apple cherry"),
            Some(("apple".into(), "cherry".into()))
        );
    }

    #[test]
    fn unrelated_messages_do_not_match() {
        let trie = trie_of(&["apple", "cranberry", "apple cranberry"]);
        for message in ["a", "pple", "cherry", "cherry apple"] {
            assert_eq!(best(&trie, message), None, "message: {message}");
        }
    }

    #[test]
    fn matching_is_case_insensitive_but_arguments_keep_casing() {
        let trie = trie_of(&["apple"]);
        assert_eq!(
            best(&trie, "APPLE Golden Delicious"),
            Some(("apple".into(), "Golden Delicious".into()))
        );
    }

    #[test]
    fn catch_all_wins_only_when_everything_else_fails() {
        let trie = trie_of(&["", "apple"]);
        assert_eq!(
            best(&trie, "apple pie"),
            Some(("apple".into(), "pie".into()))
        );
        assert_eq!(
            best(&trie, "pear pie"),
            Some(("".into(), "pear pie".into()))
        );
    }
}
