// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Top-level error for the reconciliation flows.
//!
//! Each module owns its error type; this umbrella exists at the
//! reconciler/CLI seam. Scope and coercion failures always surface before
//! any remote mutation is attempted.

use thiserror::Error;

use crate::coerce::CoercionReport;
use crate::scope::ScopeError;
use crate::snapshot::SnapshotError;
use crate::store::StoreError;
use crate::tree::TreeError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Persisted snapshot scope incompatible with the current invocation.
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// One or more leaves failed key/value validation; aggregated.
    #[error("{0}")]
    Coercion(#[from] CoercionReport),
    /// Local snapshot file missing or unreadable.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    /// The remote store collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Malformed tree shape (e.g. conflicting flat paths).
    #[error(transparent)]
    Tree(#[from] TreeError),
}
