// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Coercion of a local tree into what the remote store can hold.
//!
//! The walk never fails fast: every problem in the tree is collected so a
//! single dry run surfaces all of them. Scalars the store cannot represent
//! directly (bool/int/float/null) are rewritten to strings in place;
//! everything else must already be a string, string list or secret.

use std::fmt;

use crate::tree::{Branch, Leaf, Node, SEPARATOR};

/// Separator the remote store uses inside StringList values. List
/// elements therefore may not contain it.
pub const LIST_SEPARATOR: char = ',';

/// The three value kinds the remote store supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    String,
    StringList,
    SecureString,
}

impl LeafKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::StringList => "StringList",
            Self::SecureString => "SecureString",
        }
    }
}

impl fmt::Display for LeafKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leaf prepared for a remote write: kind, wire value, optional KMS key.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedValue {
    pub kind: LeafKind,
    pub value: String,
    pub key_id: Option<String>,
}

/// One problem found during coercion, anchored at a flat path.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionIssue {
    pub path: String,
    pub reason: String,
}

impl fmt::Display for CoercionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Aggregate of every coercion issue in one tree. Blocks the write path
/// entirely when non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionReport {
    pub issues: Vec<CoercionIssue>,
}

impl std::error::Error for CoercionReport {}

impl fmt::Display for CoercionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} coercion error(s):", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

/// Store key charset: letters, digits, `-`, `_`, `.`, `/`.
#[must_use]
pub fn key_is_valid(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
}

/// Walk the tree, rewriting coercible scalars in place and collecting
/// every violation. The caller must refuse to touch the remote store if
/// the returned set is non-empty.
pub fn coerce(node: &mut Node) -> Vec<CoercionIssue> {
    let mut issues = Vec::new();
    if let Node::Branch(children) = node {
        walk(children, "", &mut issues);
    }
    issues
}

fn walk(children: &mut Branch, prefix: &str, issues: &mut Vec<CoercionIssue>) {
    for (key, child) in children.iter_mut() {
        let path = format!("{prefix}{SEPARATOR}{key}");
        if !key_is_valid(key) {
            issues.push(CoercionIssue {
                path,
                reason: format!("invalid key {key:?}"),
            });
            // An invalid key poisons the whole subtree; no point
            // descending into paths that can never be written.
            continue;
        }
        match child {
            Node::Branch(grandchildren) => walk(grandchildren, &path, issues),
            Node::Leaf(leaf) => coerce_leaf(leaf, &path, issues),
        }
    }
}

fn coerce_leaf(leaf: &mut Leaf, path: &str, issues: &mut Vec<CoercionIssue>) {
    match leaf {
        Leaf::Str(_) | Leaf::Secret(_) => {}
        Leaf::List(items) => {
            let mut reasons = Vec::new();
            for item in items.iter() {
                match item {
                    Leaf::Str(s) if s.contains(LIST_SEPARATOR) => {
                        reasons.push(format!(
                            "StringList is {LIST_SEPARATOR:?}-separated so items may not contain it: {s:?}"
                        ));
                    }
                    Leaf::Str(_) => {}
                    Leaf::List(_) => {
                        reasons.push("cannot coerce nested list".to_string());
                    }
                    other => {
                        reasons.push(format!("list items must be strings: {other}"));
                    }
                }
            }
            if !reasons.is_empty() {
                issues.push(CoercionIssue {
                    path: path.to_string(),
                    reason: reasons.join("; "),
                });
            }
        }
        Leaf::Bool(b) => *leaf = Leaf::Str(b.to_string()),
        Leaf::Int(n) => *leaf = Leaf::Str(n.to_string()),
        Leaf::Float(n) => *leaf = Leaf::Str(n.to_string()),
        Leaf::Null => *leaf = Leaf::Str("null".to_string()),
    }
}

/// Classify a (coerced) leaf for a remote write.
#[must_use]
pub fn classify(leaf: &Leaf) -> PreparedValue {
    match leaf {
        Leaf::List(items) => PreparedValue {
            kind: LeafKind::StringList,
            value: items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(&LIST_SEPARATOR.to_string()),
            key_id: None,
        },
        Leaf::Secret(secret) => PreparedValue {
            kind: LeafKind::SecureString,
            value: secret.payload.clone(),
            key_id: secret.key_id().map(str::to_string),
        },
        other => PreparedValue {
            kind: LeafKind::String,
            value: other.to_string(),
            key_id: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Secret, KMS_KEY_METADATA};

    fn tree_with(path: &str, leaf: Leaf) -> Node {
        let mut t = Node::branch();
        t.add(path, Node::Leaf(leaf), SEPARATOR).unwrap();
        t
    }

    #[test]
    fn test_scalars_rewritten_in_place() {
        let mut tree = Node::branch();
        tree.add("/a/flag", Node::Leaf(Leaf::Bool(true)), SEPARATOR).unwrap();
        tree.add("/a/port", Node::Leaf(Leaf::Int(5432)), SEPARATOR).unwrap();
        tree.add("/a/none", Node::Leaf(Leaf::Null), SEPARATOR).unwrap();

        let issues = coerce(&mut tree);
        assert!(issues.is_empty());

        let flat = tree.flatten(SEPARATOR);
        assert_eq!(flat["/a/flag"], Leaf::from("true"));
        assert_eq!(flat["/a/port"], Leaf::from("5432"));
        assert_eq!(flat["/a/none"], Leaf::from("null"));
    }

    #[test]
    fn test_list_item_with_separator_is_one_error() {
        // {"/a": ["x,y"]} -> exactly one issue at /a
        let mut tree = tree_with("/a", Leaf::list(["x,y"]));
        let issues = coerce(&mut tree);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "/a");
    }

    #[test]
    fn test_non_string_list_item() {
        let mut tree = tree_with("/a", Leaf::List(vec![Leaf::Int(1)]));
        let issues = coerce(&mut tree);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].reason.contains("must be strings"));
    }

    #[test]
    fn test_invalid_key_recorded_and_walk_continues() {
        let mut tree = Node::branch();
        tree.add("/ok", Node::Leaf(Leaf::Int(1)), SEPARATOR).unwrap();
        if let Node::Branch(children) = &mut tree {
            children.insert("bad key".to_string(), Node::Leaf(Leaf::from("v")));
        }
        tree.add("/zz", Node::Leaf(Leaf::list(["a,b"])), SEPARATOR).unwrap();

        let issues = coerce(&mut tree);
        // both the bad key and the bad list are reported in one pass
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().any(|i| i.path == "/bad key"));
        assert!(issues.iter().any(|i| i.path == "/zz"));
        // valid scalar was still coerced
        assert_eq!(tree.flatten(SEPARATOR)["/ok"], Leaf::from("1"));
    }

    #[test]
    fn test_classify_list_joined() {
        let prepared = classify(&Leaf::list(["a", "b"]));
        assert_eq!(prepared.kind, LeafKind::StringList);
        assert_eq!(prepared.value, "a,b");
        assert_eq!(prepared.key_id, None);
    }

    #[test]
    fn test_classify_secret_carries_key_id() {
        let mut secret = Secret::new("tok");
        secret
            .metadata
            .insert(KMS_KEY_METADATA.to_string(), "alias/app".to_string());
        let prepared = classify(&Leaf::Secret(secret));
        assert_eq!(prepared.kind, LeafKind::SecureString);
        assert_eq!(prepared.value, "tok");
        assert_eq!(prepared.key_id.as_deref(), Some("alias/app"));
    }

    #[test]
    fn test_classify_plain_string() {
        let prepared = classify(&Leaf::from("v"));
        assert_eq!(prepared.kind, LeafKind::String);
        assert_eq!(prepared.value, "v");
    }

    #[test]
    fn test_key_charset() {
        assert!(key_is_valid("db-host_1.example"));
        assert!(!key_is_valid("spaced key"));
        assert!(!key_is_valid(""));
        assert!(!key_is_valid("colon:key"));
    }
}
