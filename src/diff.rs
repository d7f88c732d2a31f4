// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Diff between the remote (reference) and local (target) trees.
//!
//! The engine partitions the union of both key sets into added / removed /
//! changed / unchanged, exposes a reviewable [`DiffPlan`], and can produce
//! a merged tree under one of two fixed policies.
//!
//! Known limitation, kept on purpose: with only two snapshots there is no
//! way to tell "remote deleted this key" from "local added this key" — a
//! key present on one side is classified purely as added/removed against
//! the remote baseline. Growing a third (historical) baseline would change
//! the model and is out of scope.

use std::collections::BTreeSet;
use std::fmt;

use crate::tree::{unflatten, FlatMap, Leaf, Node, TreeError, SEPARATOR};

/// How [`DiffEngine::merge`] resolves keys present on both sides.
///
/// A closed set, selected by configuration — not an open plugin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Local additions and local edits win; remote-only keys survive
    /// with their remote value.
    PreserveLocal,
    /// Every remote value wins except genuinely new local keys.
    RemoteWins,
}

impl MergePolicy {
    /// Map the CLI `--force` flag onto a policy.
    #[must_use]
    pub fn from_force(force: bool) -> Self {
        if force {
            Self::RemoteWins
        } else {
            Self::PreserveLocal
        }
    }
}

/// One changed entry: remote value vs local value.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub old: Leaf,
    pub new: Leaf,
}

/// The reviewable set of remote mutations required to make the remote
/// side match the local side. Derived from a [`DiffEngine`]; never
/// mutates either input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiffPlan {
    /// Paths to create, with their new values.
    pub add: FlatMap,
    /// Paths to delete; old values kept for review output.
    pub delete: FlatMap,
    /// Paths to overwrite, with old and new values.
    pub change: std::collections::BTreeMap<String, Change>,
}

impl DiffPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.delete.is_empty() && self.change.is_empty()
    }

    /// Total number of remote mutations this plan implies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.add.len() + self.delete.len() + self.change.len()
    }
}

/// `+` / `-` / `~` rendering for human review. Lexicographic within each
/// section, so identical inputs always print identically.
impl fmt::Display for DiffPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no changes detected");
        }
        for (path, value) in &self.add {
            writeln!(f, "+{path} = {value}")?;
        }
        for path in self.delete.keys() {
            writeln!(f, "-{path}")?;
        }
        for (path, change) in &self.change {
            writeln!(f, "~{path}:")?;
            writeln!(f, "  < {}", change.old)?;
            writeln!(f, "  > {}", change.new)?;
        }
        Ok(())
    }
}

/// Set-based diff over two flat maps.
///
/// `remote` is the authoritative baseline; `local` is the target the plan
/// would move the remote towards.
#[derive(Debug)]
pub struct DiffEngine {
    remote: FlatMap,
    local: FlatMap,
}

impl DiffEngine {
    /// Flattens both trees at construction.
    #[must_use]
    pub fn new(remote: &Node, local: &Node) -> Self {
        Self {
            remote: remote.flatten(SEPARATOR),
            local: local.flatten(SEPARATOR),
        }
    }

    #[must_use]
    pub fn from_flat(remote: FlatMap, local: FlatMap) -> Self {
        Self { remote, local }
    }

    fn intersection(&self) -> impl Iterator<Item = &String> {
        self.local.keys().filter(|k| self.remote.contains_key(*k))
    }

    /// Paths present locally but not remotely.
    #[must_use]
    pub fn added(&self) -> BTreeSet<String> {
        self.local
            .keys()
            .filter(|k| !self.remote.contains_key(*k))
            .cloned()
            .collect()
    }

    /// Paths present remotely but not locally.
    #[must_use]
    pub fn removed(&self) -> BTreeSet<String> {
        self.remote
            .keys()
            .filter(|k| !self.local.contains_key(*k))
            .cloned()
            .collect()
    }

    /// Paths present on both sides with unequal values.
    #[must_use]
    pub fn changed(&self) -> BTreeSet<String> {
        self.intersection()
            .filter(|k| self.remote[*k] != self.local[*k])
            .cloned()
            .collect()
    }

    /// Paths present on both sides with equal values.
    #[must_use]
    pub fn unchanged(&self) -> BTreeSet<String> {
        self.intersection()
            .filter(|k| self.remote[*k] == self.local[*k])
            .cloned()
            .collect()
    }

    /// True iff anything was added, removed or changed.
    #[must_use]
    pub fn differ(&self) -> bool {
        !self.added().is_empty() || !self.removed().is_empty() || !self.changed().is_empty()
    }

    /// Build the reviewable plan.
    #[must_use]
    pub fn plan(&self) -> DiffPlan {
        let mut plan = DiffPlan::default();
        for path in self.added() {
            plan.add.insert(path.clone(), self.local[&path].clone());
        }
        for path in self.removed() {
            plan.delete.insert(path.clone(), self.remote[&path].clone());
        }
        for path in self.changed() {
            plan.change.insert(
                path.clone(),
                Change {
                    old: self.remote[&path].clone(),
                    new: self.local[&path].clone(),
                },
            );
        }
        plan
    }

    /// One reconciled tree under the given policy.
    ///
    /// Survivor sets per policy (see module doc for the two-set
    /// ambiguity this inherits):
    /// - [`MergePolicy::PreserveLocal`]: unchanged ∪ removed from remote,
    ///   added ∪ changed from local.
    /// - [`MergePolicy::RemoteWins`]: changed ∪ removed ∪ unchanged from
    ///   remote, added from local.
    pub fn merge(&self, policy: MergePolicy) -> Result<Node, TreeError> {
        let (from_remote, from_local): (BTreeSet<String>, BTreeSet<String>) = match policy {
            MergePolicy::RemoteWins => {
                let mut prior = self.changed();
                prior.extend(self.removed());
                prior.extend(self.unchanged());
                (prior, self.added())
            }
            MergePolicy::PreserveLocal => {
                let mut prior = self.unchanged();
                prior.extend(self.removed());
                let mut current = self.added();
                current.extend(self.changed());
                (prior, current)
            }
        };

        let mut state = FlatMap::new();
        for (path, leaf) in &self.remote {
            if from_remote.contains(path) {
                state.insert(path.clone(), leaf.clone());
            }
        }
        for (path, leaf) in &self.local {
            if from_local.contains(path) {
                state.insert(path.clone(), leaf.clone());
            }
        }
        unflatten(&state, SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(entries: &[(&str, &str)]) -> FlatMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), Leaf::from(*v)))
            .collect()
    }

    #[test]
    fn test_added_only() {
        // remote {/a/b/c: 1}, local {/a/b/c: 1, /x: 2} -> add /x only
        let engine = DiffEngine::from_flat(
            flat(&[("/a/b/c", "1")]),
            flat(&[("/a/b/c", "1"), ("/x", "2")]),
        );
        let plan = engine.plan();
        assert_eq!(plan.add, flat(&[("/x", "2")]));
        assert!(plan.delete.is_empty());
        assert!(plan.change.is_empty());
        assert!(engine.differ());
    }

    #[test]
    fn test_changed_records_old_and_new() {
        let engine = DiffEngine::from_flat(flat(&[("/a", "1")]), flat(&[("/a", "2")]));
        let plan = engine.plan();
        assert_eq!(
            plan.change.get("/a"),
            Some(&Change {
                old: Leaf::from("1"),
                new: Leaf::from("2"),
            })
        );
    }

    #[test]
    fn test_removed_keeps_old_value() {
        let engine = DiffEngine::from_flat(
            flat(&[("/a", "1"), ("/b", "2")]),
            flat(&[("/a", "1")]),
        );
        let plan = engine.plan();
        assert_eq!(plan.delete, flat(&[("/b", "2")]));
    }

    #[test]
    fn test_partitions_are_disjoint_and_cover() {
        let engine = DiffEngine::from_flat(
            flat(&[("/a", "1"), ("/b", "2"), ("/c", "3")]),
            flat(&[("/a", "1"), ("/b", "x"), ("/d", "4")]),
        );
        let added = engine.added();
        let removed = engine.removed();
        let changed = engine.changed();
        let unchanged = engine.unchanged();

        assert!(added.is_disjoint(&removed));
        assert!(changed.is_disjoint(&unchanged));

        let mut union = added;
        union.extend(removed);
        union.extend(changed);
        union.extend(unchanged);
        let expected: BTreeSet<String> =
            ["/a", "/b", "/c", "/d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(union, expected);
    }

    #[test]
    fn test_secret_metadata_does_not_trip_changed() {
        use crate::tree::{Secret, KMS_KEY_METADATA};

        let mut with_meta = Secret::new("s3cret");
        with_meta
            .metadata
            .insert(KMS_KEY_METADATA.to_string(), "alias/app".to_string());

        let mut remote = FlatMap::new();
        remote.insert("/token".to_string(), Leaf::Secret(with_meta));
        let mut local = FlatMap::new();
        local.insert("/token".to_string(), Leaf::Secret(Secret::new("s3cret")));

        let engine = DiffEngine::from_flat(remote, local);
        assert!(!engine.differ());
    }

    #[test]
    fn test_merge_preserve_local() {
        let engine = DiffEngine::from_flat(
            flat(&[("/keep", "r"), ("/edited", "old"), ("/gone", "g")]),
            flat(&[("/keep", "r"), ("/edited", "new"), ("/added", "a")]),
        );
        let merged = engine.merge(MergePolicy::PreserveLocal).unwrap();
        let result = merged.flatten(SEPARATOR);
        assert_eq!(
            result,
            flat(&[
                ("/keep", "r"),
                ("/edited", "new"),
                ("/gone", "g"),
                ("/added", "a"),
            ])
        );
    }

    #[test]
    fn test_merge_remote_wins() {
        let engine = DiffEngine::from_flat(
            flat(&[("/keep", "r"), ("/edited", "old"), ("/gone", "g")]),
            flat(&[("/keep", "r"), ("/edited", "new"), ("/added", "a")]),
        );
        let merged = engine.merge(MergePolicy::RemoteWins).unwrap();
        let result = merged.flatten(SEPARATOR);
        // Everything from remote, plus only the genuinely new local key.
        assert_eq!(
            result,
            flat(&[
                ("/keep", "r"),
                ("/edited", "old"),
                ("/gone", "g"),
                ("/added", "a"),
            ])
        );
    }

    #[test]
    fn test_describe_lines() {
        let engine = DiffEngine::from_flat(
            flat(&[("/b", "2"), ("/c", "old")]),
            flat(&[("/a", "1"), ("/c", "new")]),
        );
        let text = engine.plan().to_string();
        assert_eq!(text, "+/a = 1\n-/b\n~/c:\n  < old\n  > new\n");
    }

    #[test]
    fn test_describe_empty() {
        let engine = DiffEngine::from_flat(FlatMap::new(), FlatMap::new());
        assert_eq!(engine.plan().to_string(), "no changes detected");
        assert!(!engine.differ());
    }
}
