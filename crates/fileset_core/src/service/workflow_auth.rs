//! Workflow authorization resolver for edit-class file set operations.
//!
//! # Responsibility
//! - Combine direct policy grants with the parent work's indexed workflow
//!   state into one allow/deny decision.
//!
//! # Invariants
//! - Read-only: no authoritative or indexed state is written.
//! - At most one parent projection fetch per call.
//! - A suppressed parent denies unless a direct grant on the held file set
//!   document or on the parent projection applies.
//! - A non-suppressed parent allows even without a matched grant; this
//!   resolver only adds a workflow veto on top of direct access control.

use super::error::{FileSetError, NotFoundTarget};
use crate::model::file_set::{FileSetId, ParentId};
use crate::model::principal::Principal;
use crate::model::projection::FileSetDocument;
use crate::policy::{PolicyEvaluator, PolicyTarget};
use crate::repo::file_set_repo::FileSetRepository;
use crate::repo::index_repo::ParentIndex;
use log::{debug, warn};

/// Why an edit was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allowed {
    /// Direct grant on the file set document the caller already held.
    FileSetGrant,
    /// Direct grant on the parent work projection.
    ParentGrant,
    /// No grant matched, but the parent work is not suppressed.
    NotSuppressed,
}

impl Allowed {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileSetGrant => "file_set_grant",
            Self::ParentGrant => "parent_grant",
            Self::NotSuppressed => "not_suppressed",
        }
    }
}

/// Resolver borrowing the lookups and policy it consults.
pub struct WorkflowAuthorizer<'a, F, I, P> {
    file_sets: &'a F,
    index: &'a I,
    policy: &'a P,
}

impl<'a, F, I, P> WorkflowAuthorizer<'a, F, I, P>
where
    F: FileSetRepository,
    I: ParentIndex,
    P: PolicyEvaluator,
{
    pub fn new(file_sets: &'a F, index: &'a I, policy: &'a P) -> Self {
        Self {
            file_sets,
            index,
            policy,
        }
    }

    /// Decides whether `principal` may edit file set `file_set_id`.
    ///
    /// `parent_id` is derived from the authoritative file set when absent.
    /// `held` is the file set's indexed document if the caller already
    /// fetched it; a direct grant on it short-circuits the parent fetch.
    ///
    /// # Errors
    /// - `NotFound` when the file set, its parent link, or the parent
    ///   projection cannot be resolved.
    /// - `WorkflowSuppressed` when the parent projection is suppressed and no
    ///   direct grant applies.
    /// - `UpstreamUnavailable` on transient lookup failures.
    pub fn authorize_edit(
        &self,
        principal: &Principal,
        file_set_id: FileSetId,
        parent_id: Option<ParentId>,
        held: Option<&FileSetDocument>,
    ) -> Result<Allowed, FileSetError> {
        let parent_id = match parent_id {
            Some(parent_id) => parent_id,
            None => self.derive_parent_id(file_set_id)?,
        };

        if let Some(document) = held.filter(|document| document.id == file_set_id) {
            if self.policy.can_edit(principal, PolicyTarget::FileSet(document)) {
                return Ok(self.allowed(principal, file_set_id, Allowed::FileSetGrant));
            }
        }

        let projection = self
            .index
            .find_parent_projection(parent_id)?
            .ok_or(FileSetError::NotFound(NotFoundTarget::ParentProjection(
                parent_id,
            )))?;

        if self.policy.can_edit(principal, PolicyTarget::Parent(&projection)) {
            return Ok(self.allowed(principal, file_set_id, Allowed::ParentGrant));
        }

        if projection.suppressed {
            warn!(
                "event=workflow_check module=service status=denied principal={} file_set={} parent={} reason=workflow_suppressed",
                principal.log_id(),
                file_set_id,
                parent_id
            );
            return Err(FileSetError::WorkflowSuppressed {
                file_set_id,
                parent_id: Some(parent_id),
            });
        }

        Ok(self.allowed(principal, file_set_id, Allowed::NotSuppressed))
    }

    fn derive_parent_id(&self, file_set_id: FileSetId) -> Result<ParentId, FileSetError> {
        let file_set = self
            .file_sets
            .get_file_set(file_set_id)?
            .ok_or(FileSetError::NotFound(NotFoundTarget::FileSet(file_set_id)))?;
        file_set
            .parent_id
            .ok_or(FileSetError::NotFound(NotFoundTarget::ParentOf(file_set_id)))
    }

    fn allowed(&self, principal: &Principal, file_set_id: FileSetId, allowed: Allowed) -> Allowed {
        debug!(
            "event=workflow_check module=service status=ok principal={} file_set={} decision={}",
            principal.log_id(),
            file_set_id,
            allowed.as_str()
        );
        allowed
    }
}
