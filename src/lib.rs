// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # param-sync
//!
//! Reconciles a hierarchical configuration tree stored in a local YAML
//! snapshot with the same tree stored in a remote, slash-addressed
//! parameter store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Reconciler                         │
//! │  plan / init / pull / apply                             │
//! └─────────────────────────────────────────────────────────┘
//!        │                                        │
//!        ▼                                        ▼
//! ┌──────────────────────┐            ┌──────────────────────┐
//! │    LocalSnapshot     │            │   ParameterStore     │
//! │  YAML file + scope   │            │  paginated fetch,    │
//! │  metadata, !secure   │            │  per-path put/delete │
//! │  tag codec           │            │  (trait seam)        │
//! └──────────────────────┘            └──────────────────────┘
//!        │                                        │
//!        └──────────────────┬─────────────────────┘
//!                           ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                         Core                            │
//! │  tree: flatten/unflatten/search/filter/merge            │
//! │  diff: added/removed/changed partitions, plan, merge    │
//! │  coerce: value validation + store taxonomy              │
//! │  scope: snapshot metadata gate                          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The core is synchronous and pure: every operation takes owned or
//! borrowed trees and returns new values. Only the store seam (and the
//! CLI built on it) is async.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use param_sync::{MemoryStore, Reconciler, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::new());
//!     let reconciler = Reconciler::new(store, SyncConfig::default())
//!         .expect("paths within root");
//!
//!     // Capture the remote tree into parameters.yml
//!     reconciler.init().await.expect("init failed");
//!
//!     // ...edit the file, then review and push
//!     let plan = reconciler.plan().await.expect("plan failed");
//!     println!("{plan}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`tree`]: the tree/flat-map data model and path operations
//! - [`diff`]: diff engine, change plan, merge policies
//! - [`coerce`]: leaf validation and store value taxonomy
//! - [`scope`]: snapshot scope metadata and its validation gate
//! - [`snapshot`]: local YAML snapshot file
//! - [`store`]: remote parameter store trait and backends
//! - [`reconciler`]: the plan/init/pull/apply flows

pub mod coerce;
pub mod config;
pub mod diff;
pub mod error;
pub mod reconciler;
pub mod scope;
pub mod snapshot;
pub mod store;
pub mod tree;

pub use coerce::{classify, coerce, CoercionIssue, CoercionReport, LeafKind, PreparedValue};
pub use config::SyncConfig;
pub use diff::{Change, DiffEngine, DiffPlan, MergePolicy};
pub use error::SyncError;
pub use reconciler::{ApplyOutcome, Reconciler};
pub use scope::{ScopeError, ScopeState, ScopeValidator, SnapshotMetadata};
pub use snapshot::{LocalSnapshot, SnapshotError};
pub use store::{
    FetchOptions, FileStore, MemoryStore, ParameterStore, StoreConfig, StoreError, StoredParam,
};
pub use tree::{unflatten, FlatMap, Leaf, Node, Secret, TreeError, SEPARATOR};
