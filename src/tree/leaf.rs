// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Leaf values: the scalar end of the configuration tree.
//!
//! A [`Leaf`] is what sits at a terminal position in the tree. The remote
//! store only knows three kinds (plain string, string list, secure string);
//! the extra scalar variants exist because YAML decoding produces them, and
//! coercion rewrites them to strings before anything is written remotely.

use std::collections::BTreeMap;
use std::fmt;

/// Metadata key carrying the KMS key alias of an encrypted value.
pub const KMS_KEY_METADATA: &str = "aws:kms:alias";

/// A secret leaf: payload plus write-back metadata.
///
/// Equality is defined by payload alone. Metadata (key alias, encryption
/// marker) must not make two secrets with the same payload look changed
/// in a diff.
#[derive(Debug, Clone, Default)]
pub struct Secret {
    /// Plaintext, or ciphertext when `encrypted` is set.
    pub payload: String,
    /// Store-level metadata (e.g. [`KMS_KEY_METADATA`]).
    pub metadata: BTreeMap<String, String>,
    /// True when `payload` is ciphertext fetched without decryption.
    pub encrypted: bool,
}

impl Secret {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            metadata: BTreeMap::new(),
            encrypted: false,
        }
    }

    /// The KMS key alias to write this secret with, if recorded.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.metadata.get(KMS_KEY_METADATA).map(String::as_str)
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

/// A terminal value in the configuration tree.
///
/// `Str`, `List` and `Secret` are the variants the remote store can hold.
/// `Bool`/`Int`/`Float`/`Null` only appear between YAML decode and
/// coercion (see [`crate::coerce`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Str(String),
    List(Vec<Leaf>),
    Secret(Secret),
    Bool(bool),
    Int(i64),
    Float(f64),
    Null,
}

impl Leaf {
    #[must_use]
    pub fn is_str(&self) -> bool {
        matches!(self, Self::Str(_))
    }

    /// String list from pre-split elements (convenience for tests/stores).
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(|s| Self::Str(s.into())).collect())
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Secret(s) => f.write_str(&s.payload),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for Leaf {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Leaf {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
