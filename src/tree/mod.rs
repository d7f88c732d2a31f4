// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hierarchical configuration tree and its flat-path projection.
//!
//! A [`Node`] is either a branch (segment name -> child) or a [`Leaf`].
//! The same tree can be viewed as a [`FlatMap`]: absolute `/`-prefixed
//! paths mapping to leaves. `flatten` and `unflatten` convert between the
//! two views and are exact inverses for trees without empty branches.
//!
//! `BTreeMap` keeps every enumeration lexicographic, so plans and merge
//! results are reproducible across runs.

mod leaf;

pub use leaf::{Leaf, Secret, KMS_KEY_METADATA};

use std::collections::BTreeMap;
use thiserror::Error;

/// Path separator used by the remote store and all flat paths.
pub const SEPARATOR: char = '/';

/// Branch body: segment name -> child node.
pub type Branch = BTreeMap<String, Node>;

/// Flat view of a tree: absolute path -> leaf.
pub type FlatMap = BTreeMap<String, Leaf>;

#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    /// A path tried to descend through (or land on top of) an existing
    /// node of the other kind, e.g. `/a/b` when `/a` is already a leaf.
    #[error("path {path} conflicts with existing node at {prefix}")]
    PathConflict { path: String, prefix: String },
    /// A path contained an empty segment (`/a//b`).
    #[error("path {path} contains an empty segment")]
    EmptySegment { path: String },
}

/// A node of the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Branch(Branch),
    Leaf(Leaf),
}

impl Default for Node {
    fn default() -> Self {
        Self::Branch(Branch::new())
    }
}

/// Split a path into segments, ignoring leading/trailing separators.
///
/// The empty path (or bare `/`) yields no segments and addresses the root.
fn segments(path: &str, sep: char) -> impl Iterator<Item = &str> {
    path.trim_matches(sep).split(sep).filter(|s| !s.is_empty())
}

fn has_empty_segment(path: &str, sep: char) -> bool {
    path.trim_matches(sep)
        .split(sep)
        .any(str::is_empty)
        && !path.trim_matches(sep).is_empty()
}

impl Node {
    /// Empty branch node.
    #[must_use]
    pub fn branch() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch(_))
    }

    /// True for a branch with no children.
    #[must_use]
    pub fn is_empty_branch(&self) -> bool {
        matches!(self, Self::Branch(b) if b.is_empty())
    }

    #[must_use]
    pub fn as_branch(&self) -> Option<&Branch> {
        match self {
            Self::Branch(b) => Some(b),
            Self::Leaf(_) => None,
        }
    }

    #[must_use]
    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Self::Branch(_) => None,
            Self::Leaf(l) => Some(l),
        }
    }

    /// Depth-first flatten into absolute paths.
    ///
    /// Empty branches contribute nothing, which is why the
    /// flatten/unflatten round-trip only holds for trees without them.
    #[must_use]
    pub fn flatten(&self, sep: char) -> FlatMap {
        fn walk(node: &Node, prefix: &str, sep: char, out: &mut FlatMap) {
            match node {
                Node::Leaf(leaf) => {
                    out.insert(prefix.to_string(), leaf.clone());
                }
                Node::Branch(children) => {
                    for (name, child) in children {
                        walk(child, &format!("{prefix}{sep}{name}"), sep, out);
                    }
                }
            }
        }

        let mut out = FlatMap::new();
        if let Self::Branch(children) = self {
            for (name, child) in children {
                walk(child, &format!("{sep}{name}"), sep, &mut out);
            }
        }
        out
    }

    /// Install `value` at `path`, creating intermediate branches.
    ///
    /// Fails when the path runs through an existing leaf, or when the
    /// final segment already holds a branch and `value` would shadow a
    /// whole subtree with a leaf (prefix-conflicting assignments are
    /// rejected, never silently resolved).
    pub fn add(&mut self, path: &str, value: Node, sep: char) -> Result<(), TreeError> {
        if has_empty_segment(path, sep) {
            return Err(TreeError::EmptySegment {
                path: path.to_string(),
            });
        }
        let parts: Vec<&str> = segments(path, sep).collect();
        if parts.is_empty() {
            *self = value;
            return Ok(());
        }

        let mut current = self;
        let mut prefix = String::new();
        let last = parts.len() - 1;
        for (index, part) in parts.iter().enumerate() {
            prefix.push(sep);
            prefix.push_str(part);
            let children = match current {
                Node::Branch(children) => children,
                Node::Leaf(_) => {
                    return Err(TreeError::PathConflict {
                        path: path.to_string(),
                        prefix: prefix
                            .rsplit_once(sep)
                            .map(|(head, _)| head.to_string())
                            .unwrap_or_default(),
                    })
                }
            };
            if index == last {
                if matches!(children.get(*part), Some(existing) if existing.is_branch() && !value.is_branch())
                {
                    return Err(TreeError::PathConflict {
                        path: path.to_string(),
                        prefix: prefix.clone(),
                    });
                }
                children.insert((*part).to_string(), value);
                return Ok(());
            }
            current = children
                .entry((*part).to_string())
                .or_insert_with(Node::branch);
        }
        unreachable!("loop returns on last segment");
    }

    /// Walk `path`; `None` when any segment is absent. The empty path
    /// returns the node itself. Never fails.
    #[must_use]
    pub fn search(&self, path: &str, sep: char) -> Option<&Node> {
        let mut current = self;
        for part in segments(path, sep) {
            current = current.as_branch()?.get(part)?;
        }
        Some(current)
    }

    /// Singleton tree holding only the subtree at `path`, re-nested under
    /// the same prefix. A missing subtree filters to an empty branch at
    /// that position; the empty path returns the whole tree unchanged.
    #[must_use]
    pub fn filter(&self, path: &str, sep: char) -> Node {
        if segments(path, sep).next().is_none() {
            return self.clone();
        }
        let subtree = self
            .search(path, sep)
            .cloned()
            .unwrap_or_else(Node::branch);
        nest(path, subtree, sep)
    }

    /// Recursive override merge: keys in `other` win. Two branches merge
    /// per key; any leaf on `other`'s side (or this side) replaces
    /// wholesale. `self` is not mutated.
    #[must_use]
    pub fn merge(&self, other: &Node) -> Node {
        match (self, other) {
            (Node::Branch(a), Node::Branch(b)) => {
                let mut result = a.clone();
                for (key, value) in b {
                    match result.get(key) {
                        Some(existing) if existing.is_branch() && value.is_branch() => {
                            let merged = existing.merge(value);
                            result.insert(key.clone(), merged);
                        }
                        _ => {
                            result.insert(key.clone(), value.clone());
                        }
                    }
                }
                Node::Branch(result)
            }
            // A leaf on either side ends the recursion: `other` wins.
            _ => other.clone(),
        }
    }
}

/// Nest `node` back under `path` (intermediate branches only).
#[must_use]
pub fn nest(path: &str, node: Node, sep: char) -> Node {
    let mut result = node;
    for part in segments(path, sep).collect::<Vec<_>>().into_iter().rev() {
        let mut children = Branch::new();
        children.insert(part.to_string(), result);
        result = Node::Branch(children);
    }
    result
}

/// Inverse of [`Node::flatten`].
///
/// Rejects flat maps where one path is a strict prefix of another
/// (`/a` and `/a/b` cannot both hold leaves).
pub fn unflatten(flat: &FlatMap, sep: char) -> Result<Node, TreeError> {
    let mut root = Node::branch();
    for (path, leaf) in flat {
        root.add(path, Node::Leaf(leaf.clone()), sep)?;
    }
    Ok(root)
}
