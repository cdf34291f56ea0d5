// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key paths: name patterns addressing nested layers.
//!
//! A [`KeyPath`] is a list of name segments matched against layer names
//! while walking the tree. Two wildcard segments exist:
//!
//! - `*` matches exactly one name at its depth;
//! - `**` (globstar) matches zero or more consecutive names.
//!
//! The implicit root container never consumes a depth level and never
//! appears in resolved paths, so patterns address documents the way they
//! were authored, without a synthetic root segment.
//!
//! Resolution is driven by the layer tree (see
//! [`Layer::resolve_key_path`](crate::layer::Layer::resolve_key_path));
//! this module only answers per-segment questions: does a name match at a
//! depth, how far does matching advance, and is the match complete.

use alloc::string::String;
use alloc::vec::Vec;

use crate::model::CONTAINER_NAME;

/// A parsed key-path pattern, or a fully resolved concrete path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct KeyPath {
    keys: Vec<String>,
}

impl KeyPath {
    /// Creates a key path from name segments.
    #[must_use]
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// The segments of this path.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns a copy of this path with one more segment appended. Used to
    /// grow the concrete path while descending the tree.
    #[must_use]
    pub fn with_key(&self, key: &str) -> Self {
        let mut keys = self.keys.clone();
        keys.push(key.into());
        Self { keys }
    }

    /// Whether `key` matches this pattern at `depth`.
    ///
    /// The root container matches at any depth without consuming a segment.
    #[must_use]
    pub fn matches(&self, key: &str, depth: usize) -> bool {
        if key == CONTAINER_NAME {
            return true;
        }
        let Some(segment) = self.keys.get(depth) else {
            return false;
        };
        segment == key || segment == "**" || segment == "*"
    }

    /// How many depth levels a match at `depth` consumes.
    ///
    /// Plain segments and `*` consume one; `**` consumes none unless the
    /// segment after it matches `key`, in which case both are consumed.
    /// Callers check [`matches`](Self::matches) first; `depth` is in range
    /// whenever that returned true for a non-container key.
    #[must_use]
    pub fn increment_depth_by(&self, key: &str, depth: usize) -> usize {
        if key == CONTAINER_NAME {
            return 0;
        }
        if self.keys[depth] != "**" {
            return 1;
        }
        if depth == self.keys.len() - 1 {
            return 0;
        }
        if self.keys[depth + 1] == key {
            return 2;
        }
        0
    }

    /// Whether a match of `key` at `depth` completes the pattern.
    #[must_use]
    pub fn fully_resolves_to(&self, key: &str, depth: usize) -> bool {
        if depth >= self.keys.len() {
            return false;
        }
        let is_last_depth = depth == self.keys.len() - 1;
        let segment = &self.keys[depth];
        if segment != "**" {
            let matches = segment == key || segment == "*";
            return matches
                && (is_last_depth || (depth == self.keys.len() - 2 && self.ends_with_globstar()));
        }
        let next_key_matches = !is_last_depth && self.keys[depth + 1] == key;
        if next_key_matches {
            return depth == self.keys.len() - 2
                || (depth == self.keys.len() - 3 && self.ends_with_globstar());
        }
        if is_last_depth {
            return true;
        }
        if depth + 1 < self.keys.len() - 1 {
            // A globstar that is not the second-to-last segment cannot
            // complete the pattern here.
            return false;
        }
        self.keys[depth + 1] == key
    }

    /// Whether resolution should continue into the children of a layer
    /// named `key` matched at `depth`.
    #[must_use]
    pub fn propagate_to_children(&self, key: &str, depth: usize) -> bool {
        if key == CONTAINER_NAME {
            return true;
        }
        depth < self.keys.len() - 1 || self.keys[depth] == "**"
    }

    fn ends_with_globstar(&self) -> bool {
        self.keys.last().is_some_and(|k| k == "**")
    }
}
