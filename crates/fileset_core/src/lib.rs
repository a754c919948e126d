//! Core domain logic for file set mutation under parent work workflow.
//! This crate is the single source of truth for authorization and
//! version-history invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod policy;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DEFAULT_PERMITTED_METADATA_FIELDS};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::file_set::{ContentRef, FileSet, FileSetId, ParentId, ParentWork};
pub use model::mutation::{MutationKind, MutationParams, MutationRequest, UploadedFile};
pub use model::principal::Principal;
pub use model::projection::{FileSetDocument, IndexedParentProjection};
pub use model::version::{Version, VersionHistory, VersionHistoryError};
pub use policy::grant_table::GrantTable;
pub use policy::{PolicyEvaluator, PolicyTarget};
pub use repo::blob_repo::{BlobStore, SqliteBlobStore};
pub use repo::file_set_repo::{FileSetRepository, RepoError, RepoResult, SqliteFileSetRepository};
pub use repo::index_repo::{ParentIndex, SqliteParentIndex};
pub use repo::version_repo::{SqliteVersionRepository, VersionRepository};
pub use service::error::{FailureKind, FileSetError, NotFoundTarget};
pub use service::file_set_actor::{FileSetActor, MutationOutcome};
pub use service::file_set_service::{EditForm, FileSetService, FileSetView, SqliteFileSetService};
pub use service::workflow_auth::{Allowed, WorkflowAuthorizer};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
