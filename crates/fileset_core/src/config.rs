//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe logging, storage, and metadata settings in one serde shape.
//! - Validate settings before any subsystem consumes them.
//!
//! # Invariants
//! - A validated config always has a non-zero busy timeout.
//! - Permitted metadata field names are non-blank and unique.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Descriptive fields a metadata update may write by default.
pub const DEFAULT_PERMITTED_METADATA_FIELDS: &[&str] = &[
    "title",
    "creator",
    "contributor",
    "description",
    "keyword",
    "license",
    "rights_statement",
    "publisher",
    "date_created",
    "subject",
    "language",
    "identifier",
    "based_near",
    "related_url",
    "resource_type",
    "visibility",
];

const SUPPORTED_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error"];

/// Runtime configuration for the file set core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. `None` disables file logs.
    pub log_dir: Option<String>,
    /// SQLite database path. `None` selects an in-memory database.
    pub db_path: Option<String>,
    /// Maximum wait on a locked database before surfacing a transient error.
    pub busy_timeout_ms: u64,
    /// Attribute names a metadata update may write.
    pub permitted_metadata_fields: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            permitted_metadata_fields: DEFAULT_PERMITTED_METADATA_FIELDS
                .iter()
                .map(|field| field.to_string())
                .collect(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config document.
    ///
    /// Missing keys take their default values.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates settings invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.log_level.trim().to_ascii_lowercase();
        if !SUPPORTED_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::UnsupportedLogLevel(self.log_level.clone()));
        }

        if let Some(dir) = self.log_dir.as_deref() {
            if !Path::new(dir.trim()).is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.to_string()));
            }
        }

        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::ZeroBusyTimeout);
        }

        let mut seen = BTreeSet::new();
        for field in &self.permitted_metadata_fields {
            let normalized = field.trim();
            if normalized.is_empty() {
                return Err(ConfigError::BlankMetadataField);
            }
            if !seen.insert(normalized) {
                return Err(ConfigError::DuplicateMetadataField(normalized.to_string()));
            }
        }

        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Returns the permitted metadata field set, trimmed.
    pub fn permitted_fields(&self) -> BTreeSet<String> {
        self.permitted_metadata_fields
            .iter()
            .map(|field| field.trim().to_string())
            .collect()
    }
}

/// Config parse/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    UnsupportedLogLevel(String),
    RelativeLogDir(String),
    ZeroBusyTimeout,
    BlankMetadataField,
    DuplicateMetadataField(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid config document: {message}"),
            Self::UnsupportedLogLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeLogDir(dir) => {
                write!(f, "log_dir must be an absolute path, got `{dir}`")
            }
            Self::ZeroBusyTimeout => write!(f, "busy_timeout_ms must be greater than zero"),
            Self::BlankMetadataField => write!(f, "permitted metadata field must not be blank"),
            Self::DuplicateMetadataField(field) => {
                write!(f, "permitted metadata field is duplicated: {field}")
            }
        }
    }
}

impl Error for ConfigError {}
