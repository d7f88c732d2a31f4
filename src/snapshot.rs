// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local snapshot file: one YAML document holding the tree plus the
//! reserved [`METADATA_KEY`] scope record.
//!
//! Secrets are encoded as a `!secure` tagged scalar (the legacy
//! `!SecureString` tag is accepted on decode); the payload round-trips
//! exactly. The codec is a local function pair over `serde_yaml::Value` —
//! no process-wide serializer registration, no import-order dependence.

use std::path::{Path, PathBuf};

use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::debug;

use crate::error::SyncError;
use crate::scope::{ScopeValidator, SnapshotMetadata, METADATA_KEY};
use crate::tree::{nest, Branch, Leaf, Node, Secret, SEPARATOR};

const SECURE_TAG: &str = "secure";
const LEGACY_SECURE_TAG: &str = "SecureString";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot file {path} not found; run `init` first")]
    NotFound { path: PathBuf },
    #[error("failed to read or write snapshot {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {path} is not valid YAML")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("snapshot metadata under param-sync:config is malformed")]
    Metadata(#[source] serde_yaml::Error),
    #[error("unsupported snapshot value at {at}: {detail}")]
    Unsupported { at: String, detail: String },
}

/// Handle on the local snapshot for one invocation scope.
#[derive(Debug)]
pub struct LocalSnapshot {
    path: PathBuf,
    meta: SnapshotMetadata,
}

impl LocalSnapshot {
    /// Requested paths are checked against the root before any file I/O.
    pub fn new(path: impl Into<PathBuf>, meta: SnapshotMetadata) -> Result<Self, SyncError> {
        ScopeValidator::new().validate_paths(&meta.root_path, &meta.paths)?;
        Ok(Self {
            path: path.into(),
            meta,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and scope-validate the snapshot tree.
    ///
    /// The tree is re-nested under the root path (the file stores it
    /// relative to the root) and narrowed to the configured path filters.
    pub fn load(&self) -> Result<Node, SyncError> {
        let mut validator = ScopeValidator::new();
        validator.validate_paths(&self.meta.root_path, &self.meta.paths)?;

        let text = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SnapshotError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                SnapshotError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        let document: Value = serde_yaml::from_str(&text).map_err(|source| SnapshotError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let mut mapping = match document {
            Value::Null => Mapping::new(),
            Value::Mapping(m) => m,
            other => {
                return Err(SnapshotError::Unsupported {
                    at: SEPARATOR.to_string(),
                    detail: format!("document root must be a mapping, got {}", kind_name(&other)),
                }
                .into())
            }
        };

        let loaded_meta = match mapping.remove(METADATA_KEY) {
            Some(value) => {
                serde_yaml::from_value::<SnapshotMetadata>(value).map_err(SnapshotError::Metadata)?
            }
            // Hand-written snapshot without a scope record: permissive
            // defaults, matching what old files were captured under.
            None => SnapshotMetadata::default(),
        };
        validator.validate_metadata(&loaded_meta, &self.meta)?;

        let relative = decode_mapping(&mapping, "")?;
        let tree = nest(&self.meta.root_path, Node::Branch(relative), SEPARATOR);
        validator.accept()?;
        debug!(path = %self.path.display(), "loaded snapshot");

        let mut output = Node::branch();
        for path in &self.meta.paths {
            if path.trim_matches(SEPARATOR).is_empty() {
                return Ok(tree);
            }
            output = output.merge(&tree.filter(path, SEPARATOR));
        }
        Ok(output)
    }

    /// Save the tree, un-nested from the root path, with the current
    /// invocation's scope record injected.
    pub fn save(&self, tree: &Node) -> Result<(), SnapshotError> {
        let relative = tree
            .search(&self.meta.root_path, SEPARATOR)
            .cloned()
            .unwrap_or_else(Node::branch);

        let mut mapping = match encode_node(&relative) {
            Value::Mapping(m) => m,
            other => {
                return Err(SnapshotError::Unsupported {
                    at: self.meta.root_path.clone(),
                    detail: format!("root of a snapshot must be a mapping, got {}", kind_name(&other)),
                })
            }
        };
        let meta_value = serde_yaml::to_value(&self.meta).map_err(SnapshotError::Metadata)?;
        mapping.insert(Value::String(METADATA_KEY.to_string()), meta_value);

        let text = serde_yaml::to_string(&Value::Mapping(mapping)).map_err(|source| {
            SnapshotError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, text).map_err(|source| SnapshotError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), "saved snapshot");
        Ok(())
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn decode_mapping(mapping: &Mapping, prefix: &str) -> Result<Branch, SnapshotError> {
    let mut branch = Branch::new();
    for (key, value) in mapping {
        let Value::String(name) = key else {
            return Err(SnapshotError::Unsupported {
                at: if prefix.is_empty() { SEPARATOR.to_string() } else { prefix.to_string() },
                detail: format!("mapping keys must be strings, got {}", kind_name(key)),
            });
        };
        let at = format!("{prefix}{SEPARATOR}{name}");
        branch.insert(name.clone(), decode_node(value, &at)?);
    }
    Ok(branch)
}

fn decode_node(value: &Value, at: &str) -> Result<Node, SnapshotError> {
    match value {
        Value::Mapping(m) => Ok(Node::Branch(decode_mapping(m, at)?)),
        other => Ok(Node::Leaf(decode_leaf(other, at)?)),
    }
}

fn decode_leaf(value: &Value, at: &str) -> Result<Leaf, SnapshotError> {
    match value {
        Value::Null => Ok(Leaf::Null),
        Value::Bool(b) => Ok(Leaf::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Leaf::Int(i))
            } else {
                Ok(Leaf::Float(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Value::String(s) => Ok(Leaf::Str(s.clone())),
        Value::Sequence(items) => {
            let mut list = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                if matches!(item, Value::Mapping(_)) {
                    return Err(SnapshotError::Unsupported {
                        at: at.to_string(),
                        detail: format!("mapping inside a list (element {index})"),
                    });
                }
                list.push(decode_leaf(item, at)?);
            }
            Ok(Leaf::List(list))
        }
        Value::Tagged(tagged) => decode_secret(tagged, at),
        Value::Mapping(_) => Err(SnapshotError::Unsupported {
            at: at.to_string(),
            detail: "expected a scalar".to_string(),
        }),
    }
}

fn decode_secret(tagged: &TaggedValue, at: &str) -> Result<Leaf, SnapshotError> {
    let tag = tagged.tag.to_string();
    let tag = tag.trim_start_matches('!');
    if tag != SECURE_TAG && tag != LEGACY_SECURE_TAG {
        return Err(SnapshotError::Unsupported {
            at: at.to_string(),
            detail: format!("unknown tag !{tag}"),
        });
    }
    match &tagged.value {
        Value::String(payload) => Ok(Leaf::Secret(Secret::new(payload.clone()))),
        other => Err(SnapshotError::Unsupported {
            at: at.to_string(),
            detail: format!("!{tag} payload must be a string, got {}", kind_name(other)),
        }),
    }
}

fn encode_node(node: &Node) -> Value {
    match node {
        Node::Branch(children) => {
            let mut mapping = Mapping::new();
            for (name, child) in children {
                mapping.insert(Value::String(name.clone()), encode_node(child));
            }
            Value::Mapping(mapping)
        }
        Node::Leaf(leaf) => encode_leaf(leaf),
    }
}

fn encode_leaf(leaf: &Leaf) -> Value {
    match leaf {
        Leaf::Str(s) => Value::String(s.clone()),
        Leaf::List(items) => Value::Sequence(items.iter().map(encode_leaf).collect()),
        // Payload only: store-level metadata is rediscovered from the
        // store, and encrypted payloads round-trip as ciphertext.
        Leaf::Secret(secret) => Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(SECURE_TAG),
            value: Value::String(secret.payload.clone()),
        })),
        Leaf::Bool(b) => Value::Bool(*b),
        Leaf::Int(n) => Value::Number((*n).into()),
        Leaf::Float(n) => Value::Number((*n).into()),
        Leaf::Null => Value::Null,
    }
}
