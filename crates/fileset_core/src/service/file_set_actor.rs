//! Content mutation actor for one file set.
//!
//! # Responsibility
//! - Apply exactly one classified mutation (revert, replace content, or
//!   update metadata) to a loaded file set.
//! - Remove a file set on destroy.
//!
//! # Invariants
//! - The actor never authorizes; callers run the workflow check first.
//! - Replace writes the blob before the version; a failed version append
//!   leaves the current-version pointer unchanged.
//! - Metadata updates write only permitted attribute names.

use super::error::{FileSetError, NotFoundTarget};
use crate::model::file_set::{ContentRef, FileSet, ParentId};
use crate::model::mutation::{MutationKind, MutationParams, MutationRequest, UploadedFile};
use crate::model::principal::Principal;
use crate::model::version::{Version, VersionHistory};
use crate::repo::blob_repo::BlobStore;
use crate::repo::file_set_repo::FileSetRepository;
use crate::repo::version_repo::VersionRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of one successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub kind: MutationKind,
    /// File set state read back after the mutation.
    pub file_set: FileSet,
    /// Version made current by a revert or replace.
    pub version: Option<Version>,
}

/// Per-request mutation actor. Consumed by the mutation it performs.
pub struct FileSetActor<'a, F, V, B> {
    file_set: FileSet,
    principal: &'a Principal,
    file_sets: &'a F,
    versions: &'a V,
    blobs: &'a B,
    permitted_fields: &'a BTreeSet<String>,
}

impl<'a, F, V, B> FileSetActor<'a, F, V, B>
where
    F: FileSetRepository,
    V: VersionRepository,
    B: BlobStore,
{
    pub fn new(
        file_set: FileSet,
        principal: &'a Principal,
        file_sets: &'a F,
        versions: &'a V,
        blobs: &'a B,
        permitted_fields: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            file_set,
            principal,
            file_sets,
            versions,
            blobs,
            permitted_fields,
        }
    }

    /// Classifies `params` against the current version and applies it.
    ///
    /// # Errors
    /// - `NoOp` when the request matches no mutation kind.
    /// - `NotFound` when a revert names an unknown version.
    /// - `UpstreamUnavailable` on store failures.
    pub fn mutate(self, params: MutationParams) -> Result<MutationOutcome, FileSetError> {
        let request = params.classify(self.file_set.current_version.as_deref());
        match request {
            MutationRequest::Revert(label) => self.revert_content(&label),
            MutationRequest::ReplaceContent(file) => self.update_content(file),
            MutationRequest::UpdateMetadata(fields) => self.update_metadata(fields),
            MutationRequest::Empty => Err(FileSetError::NoOp(self.file_set.id)),
        }
    }

    /// Makes the version labelled `label` current again.
    pub fn revert_content(self, label: &str) -> Result<MutationOutcome, FileSetError> {
        let history = self.versions.load_history(self.file_set.id)?;
        if !history.contains_label(label) {
            return Err(FileSetError::NotFound(NotFoundTarget::Version {
                file_set_id: self.file_set.id,
                label: label.to_string(),
            }));
        }

        let version = self.versions.restore_version(self.file_set.id, label)?;
        info!(
            "event=file_set_revert module=service status=ok principal={} file_set={} label={}",
            self.principal.log_id(),
            self.file_set.id,
            version.label
        );
        self.finish(MutationKind::Revert, Some(version))
    }

    /// Stores `file` as new primary content under a fresh version.
    pub fn update_content(self, file: UploadedFile) -> Result<MutationOutcome, FileSetError> {
        let mut history = self.versions.load_history(self.file_set.id)?;
        let content_ref = self.blobs.write(&file.bytes)?;

        let version = next_version(&history, content_ref);
        history.append(version.clone()).map_err(RepoError::from)?;

        if let Err(err) = self
            .versions
            .append_version(self.file_set.id, &version, &file.file_name)
        {
            warn!(
                "event=file_set_update_content module=service status=error principal={} file_set={} orphaned_blob={} error={}",
                self.principal.log_id(),
                self.file_set.id,
                content_ref,
                err
            );
            return Err(match err {
                RepoError::FileSetNotFound(id) => {
                    FileSetError::NotFound(NotFoundTarget::FileSet(id))
                }
                other => FileSetError::UpstreamUnavailable(other.to_string()),
            });
        }

        info!(
            "event=file_set_update_content module=service status=ok principal={} file_set={} label={} bytes={}",
            self.principal.log_id(),
            self.file_set.id,
            version.label,
            file.bytes.len()
        );
        self.finish(MutationKind::ReplaceContent, Some(version))
    }

    /// Merges permitted descriptive fields onto the file set.
    ///
    /// Fields outside the permitted set are dropped.
    pub fn update_metadata(
        self,
        fields: BTreeMap<String, String>,
    ) -> Result<MutationOutcome, FileSetError> {
        let requested = fields.len();
        let permitted: BTreeMap<String, String> = fields
            .into_iter()
            .filter(|(name, _)| self.permitted_fields.contains(name))
            .collect();

        self.file_sets.merge_attributes(self.file_set.id, &permitted)?;
        info!(
            "event=file_set_update_metadata module=service status=ok principal={} file_set={} fields={} dropped={}",
            self.principal.log_id(),
            self.file_set.id,
            permitted.len(),
            requested - permitted.len()
        );
        self.finish(MutationKind::UpdateMetadata, None)
    }

    /// Deletes the file set and returns the parent it was detached from.
    pub fn destroy(self) -> Result<Option<ParentId>, FileSetError> {
        self.file_sets.delete_file_set(self.file_set.id)?;
        info!(
            "event=file_set_destroy module=service status=ok principal={} file_set={}",
            self.principal.log_id(),
            self.file_set.id
        );
        Ok(self.file_set.parent_id)
    }

    fn finish(
        self,
        kind: MutationKind,
        version: Option<Version>,
    ) -> Result<MutationOutcome, FileSetError> {
        let file_set = self
            .file_sets
            .get_file_set(self.file_set.id)?
            .ok_or(FileSetError::NotFound(NotFoundTarget::FileSet(
                self.file_set.id,
            )))?;
        Ok(MutationOutcome {
            kind,
            file_set,
            version,
        })
    }
}

fn next_version(history: &VersionHistory, content_ref: ContentRef) -> Version {
    Version {
        label: history.next_label(),
        created_at: history.next_created_at(now_epoch_ms()),
        content_ref,
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
