//! Version history model.
//!
//! # Responsibility
//! - Hold the ordered, append-only list of content versions of one file set.
//! - Validate revert targets and derive the next label/timestamp pair.
//!
//! # Invariants
//! - `all()` is strictly ascending by `created_at`.
//! - Labels are unique within one history.
//! - `latest()` is the last appended version, or `None` when empty.

use crate::model::file_set::ContentRef;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const VERSION_LABEL_PREFIX: &str = "version";

/// Immutable record of one stored content state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Opaque label, unique within the owning history.
    pub label: String,
    /// Creation time in epoch milliseconds.
    pub created_at: i64,
    /// Blob holding the bytes of this version.
    pub content_ref: ContentRef,
}

/// Append rejected because it would break history ordering or uniqueness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionHistoryError {
    DuplicateLabel(String),
    OutOfOrder { latest: i64, appended: i64 },
}

impl Display for VersionHistoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateLabel(label) => write!(f, "version label already exists: {label}"),
            Self::OutOfOrder { latest, appended } => write!(
                f,
                "version created_at {appended} is not after latest {latest}"
            ),
        }
    }
}

impl Error for VersionHistoryError {}

/// Ordered version list for one file set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionHistory {
    versions: Vec<Version>,
}

impl VersionHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from persisted rows, validating each append.
    pub fn from_versions(
        versions: impl IntoIterator<Item = Version>,
    ) -> Result<Self, VersionHistoryError> {
        let mut history = Self::new();
        for version in versions {
            history.append(version)?;
        }
        Ok(history)
    }

    /// Appends one version at the end of the history.
    ///
    /// # Errors
    /// - `DuplicateLabel` when the label is already present.
    /// - `OutOfOrder` when `created_at` does not advance past `latest()`.
    pub fn append(&mut self, version: Version) -> Result<(), VersionHistoryError> {
        if self.contains_label(&version.label) {
            return Err(VersionHistoryError::DuplicateLabel(version.label));
        }
        if let Some(latest) = self.latest() {
            if version.created_at <= latest.created_at {
                return Err(VersionHistoryError::OutOfOrder {
                    latest: latest.created_at,
                    appended: version.created_at,
                });
            }
        }
        self.versions.push(version);
        Ok(())
    }

    /// Returns the last appended version.
    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// Returns all versions, oldest first. Safe to traverse repeatedly.
    pub fn all(&self) -> &[Version] {
        &self.versions
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.find(label).is_some()
    }

    /// Finds one version by label.
    pub fn find(&self, label: &str) -> Option<&Version> {
        self.versions.iter().find(|version| version.label == label)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Derives the label for the next appended version (`version{N}`).
    ///
    /// Skips forward if a label with the computed ordinal already exists.
    pub fn next_label(&self) -> String {
        let mut ordinal = self.versions.len() + 1;
        loop {
            let label = format!("{VERSION_LABEL_PREFIX}{ordinal}");
            if !self.contains_label(&label) {
                return label;
            }
            ordinal += 1;
        }
    }

    /// Derives a creation timestamp strictly after `latest()`.
    pub fn next_created_at(&self, now_ms: i64) -> i64 {
        match self.latest() {
            Some(latest) if now_ms <= latest.created_at => latest.created_at + 1,
            _ => now_ms,
        }
    }
}

impl<'a> IntoIterator for &'a VersionHistory {
    type Item = &'a Version;
    type IntoIter = std::slice::Iter<'a, Version>;

    fn into_iter(self) -> Self::IntoIter {
        self.versions.iter()
    }
}
