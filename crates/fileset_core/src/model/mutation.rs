//! Mutation request bag and its classification.
//!
//! # Responsibility
//! - Carry raw request fields from the calling layer.
//! - Select exactly one mutation kind using a fixed priority order.
//!
//! # Invariants
//! - Priority: revert, then replace content, then update metadata.
//! - A revision equal to the currently served label is never a revert.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// One uploaded file from the calling layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Raw update fields, built once by the calling layer from request input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationParams {
    /// Requested version label to restore.
    pub revision: Option<String>,
    /// Uploaded files. Only the first is used.
    pub files: Vec<UploadedFile>,
    /// Descriptive attribute fields, unfiltered.
    pub attributes: Option<BTreeMap<String, String>>,
}

impl MutationParams {
    pub fn revert_to(label: impl Into<String>) -> Self {
        Self {
            revision: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn replace_with(file: UploadedFile) -> Self {
        Self {
            files: vec![file],
            ..Self::default()
        }
    }

    pub fn update_attributes<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            attributes: Some(
                fields
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Selects exactly one mutation kind.
    ///
    /// `current_label` is the version label the file set currently serves.
    pub fn classify(self, current_label: Option<&str>) -> MutationRequest {
        let Self {
            revision,
            files,
            attributes,
        } = self;

        if let Some(label) = revision {
            if current_label != Some(label.as_str()) {
                return MutationRequest::Revert(label);
            }
        }
        if let Some(file) = files.into_iter().next() {
            return MutationRequest::ReplaceContent(file);
        }
        match attributes {
            Some(fields) => MutationRequest::UpdateMetadata(fields),
            None => MutationRequest::Empty,
        }
    }
}

/// Classified mutation, matched exhaustively by the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRequest {
    Revert(String),
    ReplaceContent(UploadedFile),
    UpdateMetadata(BTreeMap<String, String>),
    Empty,
}

impl MutationRequest {
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Revert(_) => MutationKind::Revert,
            Self::ReplaceContent(_) => MutationKind::ReplaceContent,
            Self::UpdateMetadata(_) => MutationKind::UpdateMetadata,
            Self::Empty => MutationKind::Empty,
        }
    }
}

/// Payload-free tag of a classified mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Revert,
    ReplaceContent,
    UpdateMetadata,
    Empty,
}

impl MutationKind {
    /// Stable string used in diagnostic events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Revert => "revert",
            Self::ReplaceContent => "replace_content",
            Self::UpdateMetadata => "update_metadata",
            Self::Empty => "empty",
        }
    }
}

impl Display for MutationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
