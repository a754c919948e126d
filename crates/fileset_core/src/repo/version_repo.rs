//! Version history repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Load the ordered version history of one file set.
//! - Append a version and advance the current-version pointer atomically.
//! - Move the current-version pointer back to an existing version.
//!
//! # Invariants
//! - History rows are read as `created_at ASC, id ASC`.
//! - A failed append leaves the current-version pointer unchanged.
//! - Version rows are never updated or deleted here.

use super::{ensure_connection_ready, parse_uuid};
use super::file_set_repo::{RepoError, RepoResult};
use crate::model::file_set::FileSetId;
use crate::model::version::{Version, VersionHistory};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for file set version histories.
pub trait VersionRepository {
    /// Loads the full ordered history. Empty when no content was attached.
    fn load_history(&self, file_set_id: FileSetId) -> RepoResult<VersionHistory>;
    /// Appends `version` and makes it current, in one transaction.
    fn append_version(
        &self,
        file_set_id: FileSetId,
        version: &Version,
        file_name: &str,
    ) -> RepoResult<()>;
    /// Makes the version labelled `label` current again and returns it.
    fn restore_version(&self, file_set_id: FileSetId, label: &str) -> RepoResult<Version>;
}

/// SQLite-backed version repository.
pub struct SqliteVersionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVersionRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl VersionRepository for SqliteVersionRepository<'_> {
    fn load_history(&self, file_set_id: FileSetId) -> RepoResult<VersionHistory> {
        let mut stmt = self.conn.prepare(
            "SELECT label, created_at, content_ref
             FROM file_set_versions
             WHERE file_set_uuid = ?1
             ORDER BY created_at ASC, id ASC;",
        )?;
        let mut rows = stmt.query([file_set_id.to_string()])?;
        let mut versions = Vec::new();
        while let Some(row) = rows.next()? {
            let content_ref: String = row.get("content_ref")?;
            versions.push(Version {
                label: row.get("label")?,
                created_at: row.get("created_at")?,
                content_ref: parse_uuid(&content_ref, "file_set_versions.content_ref")?,
            });
        }

        Ok(VersionHistory::from_versions(versions)?)
    }

    fn append_version(
        &self,
        file_set_id: FileSetId,
        version: &Version,
        file_name: &str,
    ) -> RepoResult<()> {
        let id_text = file_set_id.to_string();
        let content_ref = version.content_ref.to_string();
        let tx = self.conn.unchecked_transaction()?;

        let changed = tx.execute(
            "UPDATE file_sets
             SET
                current_content = ?2,
                current_version = ?3,
                file_name = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                id_text.as_str(),
                content_ref.as_str(),
                version.label.as_str(),
                file_name,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::FileSetNotFound(file_set_id));
        }

        tx.execute(
            "INSERT INTO file_set_versions (file_set_uuid, label, created_at, content_ref, file_name)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id_text.as_str(),
                version.label.as_str(),
                version.created_at,
                content_ref.as_str(),
                file_name,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn restore_version(&self, file_set_id: FileSetId, label: &str) -> RepoResult<Version> {
        let id_text = file_set_id.to_string();
        let tx = self.conn.unchecked_transaction()?;

        let row = tx
            .query_row(
                "SELECT label, created_at, content_ref, file_name
                 FROM file_set_versions
                 WHERE file_set_uuid = ?1 AND label = ?2;",
                params![id_text.as_str(), label],
                |row| {
                    Ok((
                        row.get::<_, String>("label")?,
                        row.get::<_, i64>("created_at")?,
                        row.get::<_, String>("content_ref")?,
                        row.get::<_, Option<String>>("file_name")?,
                    ))
                },
            )
            .optional()?;
        let Some((stored_label, created_at, content_ref, file_name)) = row else {
            return Err(RepoError::VersionNotFound {
                file_set_id,
                label: label.to_string(),
            });
        };

        let changed = tx.execute(
            "UPDATE file_sets
             SET
                current_content = ?2,
                current_version = ?3,
                file_name = COALESCE(?4, file_name),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                id_text.as_str(),
                content_ref.as_str(),
                stored_label.as_str(),
                file_name.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::FileSetNotFound(file_set_id));
        }
        tx.commit()?;

        Ok(Version {
            label: stored_label,
            created_at,
            content_ref: parse_uuid(&content_ref, "file_set_versions.content_ref")?,
        })
    }
}
