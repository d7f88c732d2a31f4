//! Invocation configuration.
//!
//! # Example
//!
//! ```
//! use param_sync::SyncConfig;
//!
//! // Minimal config (uses defaults)
//! let config = SyncConfig::default();
//! assert_eq!(config.filename, "parameters.yml");
//! assert_eq!(config.root_path, "/");
//!
//! // Scoped to one service subtree
//! let config = SyncConfig {
//!     root_path: "/svc".into(),
//!     paths: vec!["/svc/db".into()],
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

use crate::scope::SnapshotMetadata;
use crate::store::FetchOptions;

/// Configuration for one run. Assembled from CLI flags; all fields have
/// defaults covering the whole remote tree.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Local snapshot file.
    #[serde(default = "default_filename")]
    pub filename: String,

    /// Root path the snapshot is authoritative for.
    #[serde(default = "default_root_path")]
    pub root_path: String,

    /// Path filters; every entry must live under `root_path`.
    #[serde(default = "default_paths")]
    pub paths: Vec<String>,

    /// Exclude secure values entirely.
    #[serde(default)]
    pub no_secure: bool,

    /// Fetch secure values without decrypting them.
    #[serde(default)]
    pub no_decrypt: bool,

    /// Named credential profile for the remote transport, if it has one.
    #[serde(default)]
    pub profile: Option<String>,
}

fn default_filename() -> String {
    "parameters.yml".to_string()
}

fn default_root_path() -> String {
    "/".to_string()
}

fn default_paths() -> Vec<String> {
    vec![default_root_path()]
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            filename: default_filename(),
            root_path: default_root_path(),
            paths: default_paths(),
            no_secure: false,
            no_decrypt: false,
            profile: None,
        }
    }
}

impl SyncConfig {
    /// The scope record this invocation would stamp on a snapshot.
    #[must_use]
    pub fn metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            root_path: self.root_path.clone(),
            paths: self.paths.clone(),
            no_secure: self.no_secure,
            no_decrypt: self.no_decrypt,
        }
    }

    #[must_use]
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            with_decryption: !self.no_decrypt,
            include_secure: !self.no_secure,
        }
    }
}
