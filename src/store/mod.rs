// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote parameter store collaborator.
//!
//! The reconciliation core only ever talks to the remote side through
//! [`ParameterStore`]: a paginated fetch into a tree, and per-path
//! put/delete driven by a diff plan. Retry, batching and credential policy
//! belong to the implementation behind the trait, never to the core.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::coerce::{LeafKind, PreparedValue, LIST_SEPARATOR};
use crate::tree::{Leaf, Secret, KMS_KEY_METADATA};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("parameter {0} not found")]
    NotFound(String),
    #[error("parameter {0} already exists and overwrite was not requested")]
    AlreadyExists(String),
    #[error("remote store error: {0}")]
    Backend(String),
}

/// Fetch-time switches derived from the invocation config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Decrypt secure values (false leaves ciphertext in the payload).
    pub with_decryption: bool,
    /// Include secure values at all.
    pub include_secure: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            with_decryption: true,
            include_secure: true,
        }
    }
}

/// One parameter as the store holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredParam {
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
}

impl StoredParam {
    #[must_use]
    pub fn from_prepared(prepared: &PreparedValue) -> Self {
        Self {
            kind: prepared.kind.as_str().to_string(),
            value: prepared.value.clone(),
            key_id: prepared.key_id.clone(),
        }
    }

    /// Reconstruct a [`Leaf`] from the wire record.
    ///
    /// `decrypted` marks whether a SecureString payload is plaintext;
    /// when false the leaf carries ciphertext and is flagged encrypted.
    #[must_use]
    pub fn to_leaf(&self, decrypted: bool) -> Leaf {
        match self.kind.as_str() {
            k if k == LeafKind::SecureString.as_str() => {
                let mut metadata = BTreeMap::new();
                if let Some(key_id) = &self.key_id {
                    metadata.insert(KMS_KEY_METADATA.to_string(), key_id.clone());
                }
                Leaf::Secret(Secret {
                    payload: self.value.clone(),
                    metadata,
                    encrypted: !decrypted,
                })
            }
            k if k == LeafKind::StringList.as_str() => {
                Leaf::list(self.value.split(LIST_SEPARATOR))
            }
            _ => Leaf::Str(self.value.clone()),
        }
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.kind == LeafKind::SecureString.as_str()
    }
}

/// Contract the core consumes: complete-tree fetch, per-path mutation.
///
/// Implementations paginate `fetch` internally and must tolerate empty
/// pages. A failure for one requested path must not discard results
/// already fetched for other paths.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch every parameter under each of `paths` as one nested tree.
    async fn fetch(
        &self,
        paths: &[String],
        options: FetchOptions,
    ) -> Result<crate::tree::Node, StoreError>;

    /// Create or overwrite one parameter.
    async fn put(
        &self,
        path: &str,
        value: &PreparedValue,
        overwrite: bool,
    ) -> Result<(), StoreError>;

    /// Delete one parameter.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}

/// Does `prefix` cover `name` in path terms? `/` covers everything;
/// otherwise coverage is segment-aligned (`/a` covers `/a/b`, not `/ab`).
#[must_use]
pub fn path_covers(prefix: &str, name: &str) -> bool {
    let prefix = prefix.trim_end_matches(crate::tree::SEPARATOR);
    if prefix.is_empty() {
        return true;
    }
    name == prefix
        || name
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(crate::tree::SEPARATOR))
}

/// Where the remote side lives. The real network transport (and whatever
/// credentials `profile` selects) plugs in here; the file backend keeps
/// the tool runnable without one.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub file: std::path::PathBuf,
    pub profile: Option<String>,
}

/// Open the configured store.
pub fn connect(config: &StoreConfig) -> Arc<dyn ParameterStore> {
    if let Some(profile) = &config.profile {
        debug!(profile, "file store has no credentials; profile recorded only");
    }
    Arc::new(FileStore::new(config.file.clone()))
}
