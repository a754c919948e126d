//! Access-control policy seam.
//!
//! # Responsibility
//! - Define the direct policy questions the workflow resolver consumes.
//! - Provide an in-memory grant table for embedding and tests.
//!
//! # Invariants
//! - Evaluators answer direct grants only; workflow state is not consulted.
//! - Anonymous principals never hold edit grants.

pub mod grant_table;

use crate::model::principal::Principal;
use crate::model::projection::{FileSetDocument, IndexedParentProjection};
use uuid::Uuid;

/// Indexed representation a policy question is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyTarget<'a> {
    FileSet(&'a FileSetDocument),
    Parent(&'a IndexedParentProjection),
}

impl PolicyTarget<'_> {
    /// Id of the object the representation describes.
    pub fn object_id(&self) -> Uuid {
        match self {
            Self::FileSet(document) => document.id,
            Self::Parent(projection) => projection.id,
        }
    }
}

/// Direct access-control decisions for one principal and target.
pub trait PolicyEvaluator {
    fn can_edit(&self, principal: &Principal, target: PolicyTarget<'_>) -> bool;
    fn can_read(&self, principal: &Principal, target: PolicyTarget<'_>) -> bool;
}
