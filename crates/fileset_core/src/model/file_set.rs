//! File set and parent work records.
//!
//! # Responsibility
//! - Define the authoritative shape of a file-bearing content unit.
//! - Define the owning parent work and its workflow flag.
//!
//! # Invariants
//! - `FileSet::parent_id` is the only ownership link; it is resolved lazily.
//! - `current_version` and `current_content` move together.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable identifier of one file set.
pub type FileSetId = Uuid;

/// Stable identifier of one parent work.
pub type ParentId = Uuid;

/// Opaque reference returned by a blob store write.
pub type ContentRef = Uuid;

/// Authoritative record for a parent work (aggregate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentWork {
    pub id: ParentId,
    pub title: String,
    /// Workflow veto: when set, child edits are blocked.
    pub suppressed: bool,
}

impl ParentWork {
    /// Creates an unsuppressed parent work with a generated id.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            suppressed: false,
        }
    }
}

/// Authoritative record for one file-bearing content unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    pub id: FileSetId,
    /// Owning parent work, if attached.
    pub parent_id: Option<ParentId>,
    /// Original file name of the current content.
    pub file_name: Option<String>,
    /// Blob currently served as primary content.
    pub current_content: Option<ContentRef>,
    /// Version label currently served. `None` until first content attach.
    pub current_version: Option<String>,
    /// Descriptive metadata fields.
    pub attributes: BTreeMap<String, String>,
}

impl FileSet {
    /// Creates an empty file set under `parent_id` with a generated id.
    ///
    /// # Invariants
    /// - No content and no version are attached yet.
    pub fn new(parent_id: Option<ParentId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id,
            file_name: None,
            current_content: None,
            current_version: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Returns one descriptive attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Returns whether `revision` names a version other than the one currently
    /// served.
    ///
    /// A file set with no current version wants to revert to any label.
    pub fn wants_to_revert(&self, revision: &str) -> bool {
        self.current_version.as_deref() != Some(revision)
    }
}
