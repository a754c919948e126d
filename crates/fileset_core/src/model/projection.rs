//! Indexed (search-side) projections of parent works and file sets.
//!
//! # Responsibility
//! - Define the denormalized read shapes fetched from the index by id.
//!
//! # Invariants
//! - Projections are never written by mutation paths.
//! - A projection may lag its authoritative record; callers tolerate this.

use crate::model::file_set::{FileSetId, ParentId};
use serde::{Deserialize, Serialize};

/// Read-optimized snapshot of a parent work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedParentProjection {
    pub id: ParentId,
    pub title: String,
    /// Workflow suppression flag as of `indexed_at`.
    pub suppressed: bool,
    /// Epoch milliseconds when the snapshot was taken.
    pub indexed_at: i64,
}

/// Read-optimized snapshot of a file set, as returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSetDocument {
    pub id: FileSetId,
    pub parent_id: Option<ParentId>,
    pub title: Option<String>,
    pub indexed_at: i64,
}
