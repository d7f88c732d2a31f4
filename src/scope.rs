// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Snapshot scope validation.
//!
//! A snapshot records the scope it was captured under (root path, path
//! filters, secure-handling flags). Before the snapshot's tree is trusted,
//! that recorded scope must be checked against the current invocation: a
//! narrower snapshot used against a wider scope would make everything
//! outside its original scope look deleted, and a secure-handling mismatch
//! could hide or leak secret material. Mismatches are fatal and never
//! auto-corrected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved top-level snapshot key holding [`SnapshotMetadata`].
/// Colon is not a legal store key character, so this namespace cannot
/// collide with real keys at any depth.
pub const METADATA_KEY: &str = "param-sync:config";

/// Scope metadata written on every snapshot save and validated on every
/// load. Field defaults keep hand-written snapshots loadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(rename = "param-sync:root", default = "default_root")]
    pub root_path: String,
    #[serde(rename = "param-sync:paths", default = "default_paths")]
    pub paths: Vec<String>,
    #[serde(rename = "param-sync:no-secure", default)]
    pub no_secure: bool,
    #[serde(rename = "param-sync:no-decrypt", default)]
    pub no_decrypt: bool,
}

fn default_root() -> String {
    "/".to_string()
}

fn default_paths() -> Vec<String> {
    vec!["/".to_string()]
}

impl Default for SnapshotMetadata {
    fn default() -> Self {
        Self {
            root_path: default_root(),
            paths: default_paths(),
            no_secure: false,
            no_decrypt: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScopeError {
    #[error("root path {root} does not contain path {path}")]
    PathOutsideRoot { root: String, path: String },
    #[error("snapshot written with no_secure={snapshot} but current invocation has no_secure={current}")]
    NoSecureMismatch { snapshot: bool, current: bool },
    #[error("snapshot written with no_decrypt={snapshot} but current invocation has no_decrypt={current}")]
    NoDecryptMismatch { snapshot: bool, current: bool },
    #[error("snapshot written with root_path={snapshot} but current invocation has root_path={current}")]
    RootPathMismatch { snapshot: String, current: String },
    #[error("path {path} was not captured when the snapshot was written")]
    PathNotCaptured { path: String },
    #[error("scope validation steps ran out of order (state: {state})")]
    OutOfOrder { state: ScopeState },
}

/// Validation progress over one snapshot load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Nothing checked yet.
    Initial,
    /// Configured paths verified against the configured root.
    PathsValidated,
    /// Snapshot metadata verified against the current invocation.
    MetadataValidated,
    /// Snapshot tree may be trusted.
    Ready,
}

impl std::fmt::Display for ScopeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "Initial"),
            Self::PathsValidated => write!(f, "PathsValidated"),
            Self::MetadataValidated => write!(f, "MetadataValidated"),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

/// Gate over snapshot load: `Initial -> PathsValidated ->
/// MetadataValidated -> Ready`, failing closed at either gate.
#[derive(Debug)]
pub struct ScopeValidator {
    state: ScopeState,
}

impl ScopeValidator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ScopeState::Initial,
        }
    }

    #[must_use]
    pub fn state(&self) -> ScopeState {
        self.state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ScopeState::Ready
    }

    /// Every requested path must share `root_path` as a literal prefix.
    /// Runs before any snapshot I/O.
    pub fn validate_paths(&mut self, root_path: &str, paths: &[String]) -> Result<(), ScopeError> {
        if self.state != ScopeState::Initial {
            return Err(ScopeError::OutOfOrder { state: self.state });
        }
        for path in paths {
            if !path.starts_with(root_path) {
                return Err(ScopeError::PathOutsideRoot {
                    root: root_path.to_string(),
                    path: path.clone(),
                });
            }
        }
        self.state = ScopeState::PathsValidated;
        Ok(())
    }

    /// Compare the metadata recorded in the snapshot against the current
    /// invocation. Field rules:
    /// - `no_secure`: exact match, always.
    /// - `no_decrypt`: exact match, but only when secure values are
    ///   handled at all (`no_secure == false`).
    /// - `root_path`: exact match.
    /// - each current path: prefix-matched by some recorded path, else it
    ///   was never captured and its absence would read as deletions.
    pub fn validate_metadata(
        &mut self,
        loaded: &SnapshotMetadata,
        current: &SnapshotMetadata,
    ) -> Result<(), ScopeError> {
        if self.state != ScopeState::PathsValidated {
            return Err(ScopeError::OutOfOrder { state: self.state });
        }
        if loaded.no_secure != current.no_secure {
            return Err(ScopeError::NoSecureMismatch {
                snapshot: loaded.no_secure,
                current: current.no_secure,
            });
        }
        if !current.no_secure && loaded.no_decrypt != current.no_decrypt {
            return Err(ScopeError::NoDecryptMismatch {
                snapshot: loaded.no_decrypt,
                current: current.no_decrypt,
            });
        }
        if loaded.root_path != current.root_path {
            return Err(ScopeError::RootPathMismatch {
                snapshot: loaded.root_path.clone(),
                current: current.root_path.clone(),
            });
        }
        for path in &current.paths {
            let captured = loaded
                .paths
                .iter()
                .any(|recorded| path.starts_with(recorded.as_str()));
            if !captured {
                return Err(ScopeError::PathNotCaptured { path: path.clone() });
            }
        }
        self.state = ScopeState::MetadataValidated;
        Ok(())
    }

    /// Final transition once the snapshot tree has been decoded.
    pub fn accept(&mut self) -> Result<(), ScopeError> {
        if self.state != ScopeState::MetadataValidated {
            return Err(ScopeError::OutOfOrder { state: self.state });
        }
        self.state = ScopeState::Ready;
        Ok(())
    }
}

impl Default for ScopeValidator {
    fn default() -> Self {
        Self::new()
    }
}
