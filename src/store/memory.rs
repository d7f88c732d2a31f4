// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory parameter store, mainly for tests and demos.
//!
//! Fetch walks the map in fixed-size pages to exercise the same paginated
//! path a network-backed store would take.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::warn;

use super::{path_covers, FetchOptions, ParameterStore, StoreError, StoredParam};
use crate::coerce::PreparedValue;
use crate::tree::{Node, SEPARATOR};

pub struct MemoryStore {
    params: RwLock<BTreeMap<String, StoredParam>>,
    page_size: usize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(10)
    }

    /// Smaller pages make pagination visible in tests.
    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            params: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.read().is_empty()
    }

    /// Seed a raw record, bypassing the trait (test setup).
    pub fn insert_raw(&self, path: &str, param: StoredParam) {
        self.params.write().insert(path.to_string(), param);
    }

    #[must_use]
    pub fn get_raw(&self, path: &str) -> Option<StoredParam> {
        self.params.read().get(path).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParameterStore for MemoryStore {
    async fn fetch(&self, paths: &[String], options: FetchOptions) -> Result<Node, StoreError> {
        let snapshot: Vec<(String, StoredParam)> = self
            .params
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut output = Node::branch();
        for prefix in paths {
            // page through the whole keyspace; empty pages are fine
            for page in snapshot.chunks(self.page_size) {
                for (name, param) in page {
                    if !path_covers(prefix, name) {
                        continue;
                    }
                    if param.is_secure() && !options.include_secure {
                        continue;
                    }
                    let leaf = param.to_leaf(options.with_decryption);
                    if let Err(err) = output.add(name, Node::Leaf(leaf), SEPARATOR) {
                        // one bad path must not abort the rest of the fetch
                        warn!(%name, %err, "skipping conflicting parameter");
                    }
                }
            }
        }
        Ok(output)
    }

    async fn put(
        &self,
        path: &str,
        value: &PreparedValue,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let mut params = self.params.write();
        if !overwrite && params.contains_key(path) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        params.insert(path.to_string(), StoredParam::from_prepared(value));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        match self.params.write().remove(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }
}
