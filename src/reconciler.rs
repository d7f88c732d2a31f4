// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Reconciliation flows: plan, init, pull, apply.
//!
//! All validation (snapshot scope, value coercion) completes before any
//! remote mutation is issued — a run is all-diagnosed-then-apply, never
//! interleaved. Apply failures are collected per path; there is no
//! rollback of already-applied puts/deletes.

use std::sync::Arc;

use tracing::{info, warn};

use crate::coerce::{classify, coerce, CoercionReport};
use crate::config::SyncConfig;
use crate::diff::{DiffEngine, DiffPlan, MergePolicy};
use crate::error::SyncError;
use crate::snapshot::LocalSnapshot;
use crate::store::{ParameterStore, StoreError};
use crate::tree::Node;

/// What one `apply` actually did against the remote store.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    pub added: usize,
    pub changed: usize,
    pub deleted: usize,
    /// Paths whose mutation failed, with the store's error. Earlier
    /// mutations stay applied.
    pub failed: Vec<(String, StoreError)>,
}

impl ApplyOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn applied(&self) -> usize {
        self.added + self.changed + self.deleted
    }
}

/// Ties the local snapshot and the remote store together.
pub struct Reconciler {
    store: Arc<dyn ParameterStore>,
    snapshot: LocalSnapshot,
    config: SyncConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Fails fast if the configured paths fall outside the root path.
    pub fn new(store: Arc<dyn ParameterStore>, config: SyncConfig) -> Result<Self, SyncError> {
        let snapshot = LocalSnapshot::new(&config.filename, config.metadata())?;
        Ok(Self {
            store,
            snapshot,
            config,
        })
    }

    async fn fetch_remote(&self) -> Result<Node, SyncError> {
        let tree = self
            .store
            .fetch(&self.config.paths, self.config.fetch_options())
            .await?;
        Ok(tree)
    }

    /// Load the local snapshot and coerce it into store-representable
    /// form. Every coercion problem is reported at once; any problem
    /// blocks the write path entirely.
    fn load_coerced_local(&self) -> Result<Node, SyncError> {
        let mut working = self.snapshot.load()?;
        let issues = coerce(&mut working);
        if !issues.is_empty() {
            return Err(CoercionReport { issues }.into());
        }
        Ok(working)
    }

    /// Compute the change plan without touching the remote store.
    pub async fn plan(&self) -> Result<DiffPlan, SyncError> {
        let local = self.load_coerced_local()?;
        let remote = self.fetch_remote().await?;
        Ok(DiffEngine::new(&remote, &local).plan())
    }

    /// Create or overwrite the local snapshot from the remote tree.
    pub async fn init(&self) -> Result<(), SyncError> {
        let remote = self.fetch_remote().await?;
        self.snapshot.save(&remote)?;
        info!(file = %self.snapshot.path().display(), "snapshot initialized from remote");
        Ok(())
    }

    /// Re-merge the local snapshot with the remote tree under `policy`
    /// and write the result back to the snapshot file.
    pub async fn pull(&self, policy: MergePolicy) -> Result<(), SyncError> {
        let local = self.snapshot.load()?;
        let remote = self.fetch_remote().await?;
        let merged = DiffEngine::new(&remote, &local).merge(policy)?;
        self.snapshot.save(&merged)?;
        info!(?policy, "snapshot merged from remote");
        Ok(())
    }

    /// Compute the plan, then walk it against the store: one put per
    /// add/change, one delete per removal. Each mutation is independent;
    /// failures are collected, not retried.
    pub async fn apply(&self) -> Result<ApplyOutcome, SyncError> {
        let plan = self.plan().await?;
        let mut outcome = ApplyOutcome::default();

        for (path, leaf) in &plan.add {
            info!(%path, "add");
            match self.store.put(path, &classify(leaf), false).await {
                Ok(()) => outcome.added += 1,
                Err(err) => {
                    warn!(%path, %err, "add failed");
                    outcome.failed.push((path.clone(), err));
                }
            }
        }
        for (path, change) in &plan.change {
            info!(%path, "change");
            match self.store.put(path, &classify(&change.new), true).await {
                Ok(()) => outcome.changed += 1,
                Err(err) => {
                    warn!(%path, %err, "change failed");
                    outcome.failed.push((path.clone(), err));
                }
            }
        }
        for path in plan.delete.keys() {
            info!(%path, "delete");
            match self.store.delete(path).await {
                Ok(()) => outcome.deleted += 1,
                Err(err) => {
                    warn!(%path, %err, "delete failed");
                    outcome.failed.push((path.clone(), err));
                }
            }
        }
        Ok(outcome)
    }
}
