//! Service-level failure taxonomy.
//!
//! # Invariants
//! - `WorkflowSuppressed` is never folded into `Unauthorized`.
//! - Transient storage conditions surface as `UpstreamUnavailable`; nothing
//!   here retries.

use crate::model::file_set::{ContentRef, FileSetId, ParentId};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// What could not be resolved for a `NotFound` failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundTarget {
    FileSet(FileSetId),
    /// The file set exists but has no parent work attached.
    ParentOf(FileSetId),
    Parent(ParentId),
    /// No indexed projection exists for the parent work.
    ParentProjection(ParentId),
    Version { file_set_id: FileSetId, label: String },
    /// The file set has no content attached yet.
    Content(FileSetId),
    Blob(ContentRef),
}

impl Display for NotFoundTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileSet(id) => write!(f, "file set {id}"),
            Self::ParentOf(id) => write!(f, "parent of file set {id}"),
            Self::Parent(id) => write!(f, "parent work {id}"),
            Self::ParentProjection(id) => write!(f, "indexed parent work {id}"),
            Self::Version { file_set_id, label } => {
                write!(f, "version `{label}` of file set {file_set_id}")
            }
            Self::Content(id) => write!(f, "content of file set {id}"),
            Self::Blob(id) => write!(f, "blob {id}"),
        }
    }
}

/// Payload-free failure category for calling layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    Unauthorized,
    WorkflowSuppressed,
    NoOp,
    UpstreamUnavailable,
    Internal,
}

impl FailureKind {
    /// Stable string used as `error_code` in diagnostic events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::WorkflowSuppressed => "workflow_suppressed",
            Self::NoOp => "no_op",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::Internal => "internal",
        }
    }
}

/// Failure returned by authorization, mutation, and read operations.
#[derive(Debug)]
pub enum FileSetError {
    NotFound(NotFoundTarget),
    /// Principal may not perform edit-class operations on this file set.
    Unauthorized(FileSetId),
    /// Parent work workflow state vetoes the operation.
    WorkflowSuppressed {
        file_set_id: FileSetId,
        parent_id: Option<ParentId>,
    },
    /// Request matched no mutation kind.
    NoOp(FileSetId),
    /// Index or blob store could not be reached; safe to retry.
    UpstreamUnavailable(String),
    /// Non-transient persistence fault.
    Repo(RepoError),
}

impl FileSetError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_) => FailureKind::NotFound,
            Self::Unauthorized(_) => FailureKind::Unauthorized,
            Self::WorkflowSuppressed { .. } => FailureKind::WorkflowSuppressed,
            Self::NoOp(_) => FailureKind::NoOp,
            Self::UpstreamUnavailable(_) => FailureKind::UpstreamUnavailable,
            Self::Repo(_) => FailureKind::Internal,
        }
    }
}

impl Display for FileSetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(target) => write!(f, "not found: {target}"),
            Self::Unauthorized(id) => write!(f, "not authorized to edit file set {id}"),
            Self::WorkflowSuppressed {
                file_set_id,
                parent_id: Some(parent_id),
            } => write!(
                f,
                "file set {file_set_id} is unavailable: parent work {parent_id} is suppressed"
            ),
            Self::WorkflowSuppressed {
                file_set_id,
                parent_id: None,
            } => write!(f, "file set {file_set_id} is unavailable: no visible parent work"),
            Self::NoOp(id) => write!(f, "update request for file set {id} matched no change"),
            Self::UpstreamUnavailable(message) => write!(f, "upstream unavailable: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FileSetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for FileSetError {
    fn from(value: RepoError) -> Self {
        if value.is_transient() {
            return Self::UpstreamUnavailable(value.to_string());
        }
        match value {
            RepoError::FileSetNotFound(id) => Self::NotFound(NotFoundTarget::FileSet(id)),
            RepoError::ParentNotFound(id) => Self::NotFound(NotFoundTarget::Parent(id)),
            RepoError::VersionNotFound { file_set_id, label } => {
                Self::NotFound(NotFoundTarget::Version { file_set_id, label })
            }
            RepoError::BlobNotFound(id) => Self::NotFound(NotFoundTarget::Blob(id)),
            other => Self::Repo(other),
        }
    }
}
