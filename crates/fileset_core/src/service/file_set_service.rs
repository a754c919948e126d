//! File set use-case service.
//!
//! # Responsibility
//! - Expose authorize/mutate/destroy/show/edit entry points by id.
//! - Run the workflow check before every edit-class operation.
//!
//! # Invariants
//! - Edit-class operations require an authenticated principal.
//! - No mutation is attempted after a denied workflow check.
//! - Concurrent requests on one file set are not coordinated here; the
//!   store's transactions and unique version labels are the only guard.

use super::error::{FileSetError, NotFoundTarget};
use super::file_set_actor::{FileSetActor, MutationOutcome};
use super::workflow_auth::{Allowed, WorkflowAuthorizer};
use crate::config::CoreConfig;
use crate::model::file_set::{FileSet, FileSetId, ParentId};
use crate::model::mutation::MutationParams;
use crate::model::principal::Principal;
use crate::model::projection::{FileSetDocument, IndexedParentProjection};
use crate::model::version::Version;
use crate::policy::{PolicyEvaluator, PolicyTarget};
use crate::repo::blob_repo::{BlobStore, SqliteBlobStore};
use crate::repo::file_set_repo::{FileSetRepository, SqliteFileSetRepository};
use crate::repo::index_repo::{ParentIndex, SqliteParentIndex};
use crate::repo::version_repo::{SqliteVersionRepository, VersionRepository};
use crate::repo::RepoResult;
use log::error;
use rusqlite::Connection;
use std::collections::BTreeSet;

/// Read model returned by `show`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSetView {
    pub document: FileSetDocument,
    pub parent: IndexedParentProjection,
}

/// Read model returned by `edit_form`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub file_set: FileSet,
    pub parent_id: ParentId,
    /// Versions oldest first.
    pub versions: Vec<Version>,
}

/// Service facade over file set stores, index, and policy.
pub struct FileSetService<F, V, B, I, P> {
    file_sets: F,
    versions: V,
    blobs: B,
    index: I,
    policy: P,
    permitted_fields: BTreeSet<String>,
}

/// Service wired to SQLite stores sharing one connection.
pub type SqliteFileSetService<'conn, P> = FileSetService<
    SqliteFileSetRepository<'conn>,
    SqliteVersionRepository<'conn>,
    SqliteBlobStore<'conn>,
    SqliteParentIndex<'conn>,
    P,
>;

impl<'conn, P: PolicyEvaluator> SqliteFileSetService<'conn, P> {
    /// Builds a service over one migrated connection.
    pub fn try_from_connection(
        conn: &'conn Connection,
        policy: P,
        config: &CoreConfig,
    ) -> RepoResult<Self> {
        Ok(Self::new(
            SqliteFileSetRepository::try_new(conn)?,
            SqliteVersionRepository::try_new(conn)?,
            SqliteBlobStore::try_new(conn)?,
            SqliteParentIndex::try_new(conn)?,
            policy,
            config,
        ))
    }
}

impl<F, V, B, I, P> FileSetService<F, V, B, I, P>
where
    F: FileSetRepository,
    V: VersionRepository,
    B: BlobStore,
    I: ParentIndex,
    P: PolicyEvaluator,
{
    pub fn new(file_sets: F, versions: V, blobs: B, index: I, policy: P, config: &CoreConfig) -> Self {
        Self {
            file_sets,
            versions,
            blobs,
            index,
            policy,
            permitted_fields: config.permitted_fields(),
        }
    }

    pub fn file_sets(&self) -> &F {
        &self.file_sets
    }

    pub fn versions(&self) -> &V {
        &self.versions
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Runs the workflow authorization check. See `WorkflowAuthorizer`.
    pub fn authorize_edit(
        &self,
        principal: &Principal,
        file_set_id: FileSetId,
        parent_id: Option<ParentId>,
        held: Option<&FileSetDocument>,
    ) -> Result<Allowed, FileSetError> {
        self.authorizer()
            .authorize_edit(principal, file_set_id, parent_id, held)
    }

    /// Applies one mutation selected from `params`.
    ///
    /// # Errors
    /// - `Unauthorized` for anonymous principals.
    /// - `WorkflowSuppressed` when the parent work vetoes edits.
    /// - `NoOp` when `params` selects no mutation.
    pub fn mutate(
        &self,
        principal: &Principal,
        file_set_id: FileSetId,
        params: MutationParams,
    ) -> Result<MutationOutcome, FileSetError> {
        let result = self
            .checked_actor(principal, file_set_id)
            .and_then(|actor| actor.mutate(params));
        log_failure("file_set_update", principal, file_set_id, &result);
        result
    }

    /// Deletes a file set after checking its existing parent.
    ///
    /// Returns the parent work the file set was detached from.
    pub fn destroy(
        &self,
        principal: &Principal,
        file_set_id: FileSetId,
    ) -> Result<ParentId, FileSetError> {
        let result = self.checked_actor(principal, file_set_id).and_then(|actor| {
            actor.destroy()?.ok_or(FileSetError::NotFound(NotFoundTarget::ParentOf(
                file_set_id,
            )))
        });
        log_failure("file_set_destroy", principal, file_set_id, &result);
        result
    }

    /// Returns the indexed view of a file set and its parent work.
    ///
    /// Available to anonymous principals. The file set's own document is
    /// fetched first and held for the workflow check.
    ///
    /// # Errors
    /// - `Unauthorized` when the document is missing or unreadable.
    /// - `WorkflowSuppressed` when no readable parent projection exists.
    pub fn show(
        &self,
        principal: &Principal,
        file_set_id: FileSetId,
        parent_id: Option<ParentId>,
    ) -> Result<FileSetView, FileSetError> {
        let result = self.show_inner(principal, file_set_id, parent_id);
        log_failure("file_set_show", principal, file_set_id, &result);
        result
    }

    /// Returns the edit form model: file set, parent id, and version list.
    pub fn edit_form(
        &self,
        principal: &Principal,
        file_set_id: FileSetId,
    ) -> Result<EditForm, FileSetError> {
        let (file_set, parent_id) = self.checked_file_set(principal, file_set_id)?;
        let history = self.versions.load_history(file_set_id)?;
        Ok(EditForm {
            file_set,
            parent_id,
            versions: history.all().to_vec(),
        })
    }

    /// Reads the bytes currently served by a file set.
    pub fn read_current_content(
        &self,
        principal: &Principal,
        file_set_id: FileSetId,
    ) -> Result<Vec<u8>, FileSetError> {
        let view = self.show_inner(principal, file_set_id, None)?;
        let file_set = self
            .file_sets
            .get_file_set(view.document.id)?
            .ok_or(FileSetError::NotFound(NotFoundTarget::FileSet(file_set_id)))?;
        let content_ref = file_set
            .current_content
            .ok_or(FileSetError::NotFound(NotFoundTarget::Content(file_set_id)))?;
        Ok(self.blobs.read(content_ref)?)
    }

    fn show_inner(
        &self,
        principal: &Principal,
        file_set_id: FileSetId,
        parent_id: Option<ParentId>,
    ) -> Result<FileSetView, FileSetError> {
        let held = self.index.find_file_set_document(file_set_id)?;
        let parent_id = parent_id.or_else(|| held.as_ref().and_then(|doc| doc.parent_id));
        self.authorize_edit(principal, file_set_id, parent_id, held.as_ref())?;

        let document = held
            .filter(|doc| self.policy.can_read(principal, PolicyTarget::FileSet(doc)))
            .ok_or(FileSetError::Unauthorized(file_set_id))?;

        let suppressed = || FileSetError::WorkflowSuppressed {
            file_set_id,
            parent_id: document.parent_id,
        };
        let parent_id = document.parent_id.ok_or_else(suppressed)?;
        let parent = self
            .index
            .find_parent_projection(parent_id)?
            .filter(|parent| self.policy.can_read(principal, PolicyTarget::Parent(parent)))
            .ok_or_else(suppressed)?;

        Ok(FileSetView { document, parent })
    }

    fn checked_file_set(
        &self,
        principal: &Principal,
        file_set_id: FileSetId,
    ) -> Result<(FileSet, ParentId), FileSetError> {
        if !principal.is_authenticated() {
            return Err(FileSetError::Unauthorized(file_set_id));
        }

        let file_set = self
            .file_sets
            .get_file_set(file_set_id)?
            .ok_or(FileSetError::NotFound(NotFoundTarget::FileSet(file_set_id)))?;
        let parent_id = file_set
            .parent_id
            .ok_or(FileSetError::NotFound(NotFoundTarget::ParentOf(file_set_id)))?;

        self.authorize_edit(principal, file_set_id, Some(parent_id), None)?;
        Ok((file_set, parent_id))
    }

    fn checked_actor<'a>(
        &'a self,
        principal: &'a Principal,
        file_set_id: FileSetId,
    ) -> Result<FileSetActor<'a, F, V, B>, FileSetError> {
        let (file_set, _) = self.checked_file_set(principal, file_set_id)?;
        Ok(FileSetActor::new(
            file_set,
            principal,
            &self.file_sets,
            &self.versions,
            &self.blobs,
            &self.permitted_fields,
        ))
    }

    fn authorizer(&self) -> WorkflowAuthorizer<'_, F, I, P> {
        WorkflowAuthorizer::new(&self.file_sets, &self.index, &self.policy)
    }
}

fn log_failure<T>(
    event: &str,
    principal: &Principal,
    file_set_id: FileSetId,
    result: &Result<T, FileSetError>,
) {
    if let Err(err) = result {
        error!(
            "event={} module=service status=error principal={} file_set={} error_code={} error={}",
            event,
            principal.log_id(),
            file_set_id,
            err.kind().as_str(),
            err
        );
    }
}
