// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! File-backed parameter store: one JSON document mapping absolute paths
//! to [`StoredParam`] records.
//!
//! This is the shippable stand-in for a real remote transport — it sits
//! behind the same [`ParameterStore`] seam an SSM or etcd client would,
//! so the rest of the tool is already transport-agnostic.

use std::path::PathBuf;

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{path_covers, FetchOptions, ParameterStore, StoreError, StoredParam};
use crate::coerce::PreparedValue;
use crate::tree::{Node, SEPARATOR};

pub struct FileStore {
    path: PathBuf,
}

type Document = BTreeMap<String, StoredParam>;

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_document(&self) -> Result<Document, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| StoreError::Backend(format!("corrupt store document: {e}"))),
            // A store that does not exist yet is just empty.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(StoreError::Backend(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write_document(&self, document: &Document) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(document)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tokio::fs::write(&self.path, text).await.map_err(|e| {
            StoreError::Backend(format!("cannot write {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl ParameterStore for FileStore {
    async fn fetch(&self, paths: &[String], options: FetchOptions) -> Result<Node, StoreError> {
        let document = self.read_document().await?;
        debug!(params = document.len(), "fetched store document");

        let mut output = Node::branch();
        for prefix in paths {
            for (name, param) in &document {
                if !path_covers(prefix, name) {
                    continue;
                }
                if param.is_secure() && !options.include_secure {
                    continue;
                }
                let leaf = param.to_leaf(options.with_decryption);
                if let Err(err) = output.add(name, Node::Leaf(leaf), SEPARATOR) {
                    warn!(%name, %err, "skipping conflicting parameter");
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
        let mut document = self.read_document().await?;
        if !overwrite && document.contains_key(path) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        document.insert(path.to_string(), StoredParam::from_prepared(value));
        self.write_document(&document).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut document = self.read_document().await?;
        if document.remove(path).is_none() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        self.write_document(&document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::LeafKind;

    fn prepared(value: &str) -> PreparedValue {
        PreparedValue {
            kind: LeafKind::String,
            value: value.to_string(),
            key_id: None,
        }
    }

    #[tokio::test]
    async fn test_missing_file_fetches_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("remote.json"));
        let tree = store
            .fetch(&["/".to_string()], FetchOptions::default())
            .await
            .unwrap();
        assert!(tree.is_empty_branch());
    }

    #[tokio::test]
    async fn test_put_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote.json");

        let store = FileStore::new(&path);
        store.put("/svc/key", &prepared("v"), false).await.unwrap();

        let reopened = FileStore::new(&path);
        let tree = reopened
            .fetch(&["/".to_string()], FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(
            tree.flatten(SEPARATOR)["/svc/key"],
            crate::tree::Leaf::from("v")
        );
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("remote.json"));
        let err = store.delete("/nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
