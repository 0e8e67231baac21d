// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Token-routed command trees.
//!
//! Each module owns a [`CommandTree`]: a nested token→node mapping whose
//! leaves are command handlers. Walking the tree consumes one whitespace
//! token per branch level; a branch may hold a `""` default child that
//! catches otherwise-unmatched input at that depth. The root may not hold
//! a default child, so a module can never swallow every command outright.
//!
//! The tree also drives interactive autocomplete via [`CommandTree::complete`],
//! which is independent of dispatch: it matches child keys by string
//! prefix and reports the closest unambiguous position reached.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::{error::InterpreterError, response::Response};

/// Key of a branch's default child.
pub const DEFAULT_KEY: &str = "";

/// A leaf handler. Receives the unconsumed remainder of the tokenized
/// command; returning [`Response::Empty`] means "not handled here".
pub type CommandHandler = Box<dyn FnMut(&[String]) -> Result<Response>>;

enum Node {
    Branch(BTreeMap<String, Node>),
    Leaf(CommandHandler),
}

/// Nested token→node mapping routing a tokenized command to a handler.
#[derive(Default)]
pub struct CommandTree {
    children: BTreeMap<String, Node>,
}

/// Result of the closest-match walk: the command prefix matched so far,
/// the candidate keys at the stopping point (if any), and the input
/// tokens left unconsumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub matched: Vec<String>,
    pub candidates: Option<Vec<String>>,
    pub remainder: Vec<String>,
}

impl CommandTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` at the end of `path`, creating branches on the way.
    ///
    /// A `""` element is a default child and is valid anywhere except the
    /// first position. Binding a path that descends through an existing
    /// handler is rejected; binding exactly onto an existing node replaces
    /// it.
    pub fn insert(&mut self, path: &[&str], handler: CommandHandler) -> Result<(), InterpreterError> {
        let Some((last, prefix)) = path.split_last() else {
            return Err(InterpreterError::EmptyPath);
        };
        if path[0].is_empty() {
            return Err(InterpreterError::RootDefault);
        }

        let mut children = &mut self.children;
        for token in prefix {
            let entry = children
                .entry((*token).to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            match entry {
                Node::Branch(map) => children = map,
                Node::Leaf(_) => {
                    return Err(InterpreterError::PathThroughLeaf(path.join(" ")));
                }
            }
        }
        children.insert((*last).to_string(), Node::Leaf(handler));
        Ok(())
    }

    /// Route `tokens` to a handler and invoke it with the unconsumed
    /// remainder. Returns `None` when no route exists in this tree.
    pub fn walk(&mut self, tokens: &[String]) -> Option<Result<Response>> {
        let mut children = &mut self.children;
        let mut consumed = 0;
        loop {
            let key = match tokens.get(consumed) {
                Some(token) if children.contains_key(token.as_str()) => {
                    consumed += 1;
                    tokens[consumed - 1].as_str()
                }
                // Missing match, or tokens exhausted on a branch: fall back
                // to this depth's default child.
                _ => DEFAULT_KEY,
            };
            match children.get_mut(key)? {
                Node::Leaf(handler) => return Some(handler(&tokens[consumed..])),
                Node::Branch(map) => children = map,
            }
        }
    }

    /// Closest-match walk for interactive autocomplete.
    ///
    /// At each level the candidate set is the child keys that the current
    /// input token is a string-prefix of. A single candidate is consumed
    /// and descended into; with several candidates an exact match is
    /// preferred when more input remains. Otherwise the walk stops and
    /// reports where it got to. Default children never appear in
    /// candidate sets.
    pub fn complete(&self, input: &str) -> Completion {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let mut children = &self.children;
        let mut matched = Vec::new();
        let mut consumed = 0;

        loop {
            let Some(token) = tokens.get(consumed) else {
                // Input exhausted: offer everything at this level.
                return Completion {
                    matched,
                    candidates: candidate_set(visible_keys(children)),
                    remainder: Vec::new(),
                };
            };

            let candidates: Vec<String> = visible_keys(children)
                .into_iter()
                .filter(|key| key.starts_with(*token))
                .collect();

            let descend = match candidates.len() {
                1 => Some(candidates[0].clone()),
                n if n > 1
                    && consumed + 1 < tokens.len()
                    && candidates.iter().any(|key| key == token) =>
                {
                    Some((*token).to_string())
                }
                _ => None,
            };

            let node = descend.as_ref().and_then(|key| children.get(key));
            let (Some(key), Some(node)) = (descend, node) else {
                return Completion {
                    matched,
                    candidates: candidate_set(candidates),
                    remainder: tokens[consumed..].iter().map(|t| t.to_string()).collect(),
                };
            };

            matched.push(key);
            consumed += 1;
            match node {
                Node::Branch(map) => children = map,
                Node::Leaf(_) => {
                    // Reached a command; nothing further to suggest.
                    return Completion {
                        matched,
                        candidates: None,
                        remainder: tokens[consumed..].iter().map(|t| t.to_string()).collect(),
                    };
                }
            }
        }
    }
}

fn visible_keys(children: &BTreeMap<String, Node>) -> Vec<String> {
    children
        .keys()
        .filter(|key| !key.is_empty())
        .cloned()
        .collect()
}

fn candidate_set(candidates: Vec<String>) -> Option<Vec<String>> {
    if candidates.is_empty() {
        None
    } else {
        Some(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(text: &str) -> CommandHandler {
        let text = text.to_string();
        Box::new(move |_| Ok(Response::Reply(text.clone())))
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    fn reply_text(result: Option<anyhow::Result<Response>>) -> String {
        match result {
            Some(Ok(Response::Reply(text))) => text,
            other => panic!("expected a reply, got {other:?}"),
        }
    }

    fn player_tree() -> CommandTree {
        let mut tree = CommandTree::new();
        tree.insert(&["player", "play"], reply("playing")).unwrap();
        tree.insert(&["player", "pause"], reply("paused")).unwrap();
        tree.insert(&["player", "volume"], reply("volume")).unwrap();
        tree.insert(&["playlist"], reply("playlist")).unwrap();
        tree
    }

    #[test]
    fn walk_routes_tokens_to_the_leaf() {
        let mut tree = player_tree();
        assert_eq!(reply_text(tree.walk(&tokens("player play"))), "playing");
        assert_eq!(reply_text(tree.walk(&tokens("playlist"))), "playlist");
        assert!(tree.walk(&tokens("player stop")).is_none());
        assert!(tree.walk(&tokens("nope")).is_none());
    }

    #[test]
    fn walk_passes_the_unconsumed_remainder() {
        let mut tree = CommandTree::new();
        tree.insert(
            &["say"],
            Box::new(|rest| Ok(Response::Reply(rest.join(" ")))),
        )
        .unwrap();
        assert_eq!(reply_text(tree.walk(&tokens("say hello there"))), "hello there");
        assert_eq!(reply_text(tree.walk(&tokens("say"))), "");
    }

    #[test]
    fn walk_falls_back_to_the_default_child() {
        let mut tree = CommandTree::new();
        tree.insert(&["player", "play"], reply("playing")).unwrap();
        tree.insert(
            &["player", ""],
            Box::new(|rest| Ok(Response::Reply(format!("default: {}", rest.join(" "))))),
        )
        .unwrap();

        // Unmatched token at this depth is not consumed by the default.
        assert_eq!(
            reply_text(tree.walk(&tokens("player shuffle on"))),
            "default: shuffle on"
        );
        // Tokens exhausted on the branch also resolve via the default.
        assert_eq!(reply_text(tree.walk(&tokens("player"))), "default: ");
    }

    #[test]
    fn root_default_key_is_rejected() {
        let mut tree = CommandTree::new();
        let result = tree.insert(&[""], reply("catch-all"));
        assert!(matches!(result, Err(InterpreterError::RootDefault)));
        let result = tree.insert(&["", "x"], reply("catch-all"));
        assert!(matches!(result, Err(InterpreterError::RootDefault)));
    }

    #[test]
    fn inserting_through_a_leaf_is_rejected() {
        let mut tree = CommandTree::new();
        tree.insert(&["play"], reply("playing")).unwrap();
        let result = tree.insert(&["play", "loud"], reply("louder"));
        assert!(matches!(result, Err(InterpreterError::PathThroughLeaf(_))));
    }

    #[test]
    fn empty_path_is_rejected() {
        let mut tree = CommandTree::new();
        assert!(matches!(
            tree.insert(&[], reply("x")),
            Err(InterpreterError::EmptyPath)
        ));
    }

    #[test]
    fn complete_descends_a_single_prefix_candidate() {
        let tree = player_tree();
        // "vol" is a prefix of exactly one key under "player".
        let completion = tree.complete("player vol");
        assert_eq!(completion.matched, vec!["player", "volume"]);
        assert_eq!(completion.candidates, None);
        assert!(completion.remainder.is_empty());
    }

    #[test]
    fn complete_stops_on_ambiguity() {
        let tree = player_tree();
        let completion = tree.complete("pla");
        assert!(completion.matched.is_empty());
        assert_eq!(
            completion.candidates,
            Some(vec!["player".to_string(), "playlist".to_string()])
        );
        assert_eq!(completion.remainder, vec!["pla".to_string()]);
    }

    #[test]
    fn complete_prefers_the_exact_match_when_input_remains() {
        let mut tree = CommandTree::new();
        tree.insert(&["play", "loud"], reply("loud")).unwrap();
        tree.insert(&["playlist"], reply("playlist")).unwrap();

        // "play" matches both keys by prefix, but it is exact and more
        // input follows, so the walk descends into it.
        let completion = tree.complete("play lo");
        assert_eq!(completion.matched, vec!["play", "loud"]);
        assert_eq!(completion.candidates, None);
        assert!(completion.remainder.is_empty());

        // Without further input the ambiguity is reported instead.
        let completion = tree.complete("play");
        assert!(completion.matched.is_empty());
        assert_eq!(
            completion.candidates,
            Some(vec!["play".to_string(), "playlist".to_string()])
        );
    }

    #[test]
    fn complete_offers_all_keys_when_input_runs_out() {
        let tree = player_tree();
        let completion = tree.complete("");
        assert!(completion.matched.is_empty());
        assert_eq!(
            completion.candidates,
            Some(vec!["player".to_string(), "playlist".to_string()])
        );
    }

    #[test]
    fn complete_reports_no_candidates_for_unknown_input() {
        let tree = player_tree();
        let completion = tree.complete("quit now");
        assert!(completion.matched.is_empty());
        assert_eq!(completion.candidates, None);
        assert_eq!(
            completion.remainder,
            vec!["quit".to_string(), "now".to_string()]
        );
    }

    #[test]
    fn complete_never_offers_default_children() {
        let mut tree = CommandTree::new();
        tree.insert(&["player", "play"], reply("playing")).unwrap();
        tree.insert(&["player", ""], reply("default")).unwrap();
        let completion = tree.complete("player ");
        assert_eq!(completion.candidates, Some(vec!["play".to_string()]));
    }
}
