//! Index (search-side) projection lookups and indexer hooks.
//!
//! # Responsibility
//! - Fetch parent work projections and file set documents by id.
//! - Provide indexer-side writes used by reindex jobs and fixtures.
//!
//! # Invariants
//! - Authorization and mutation paths only read through `ParentIndex`.
//! - Index rows are snapshots; they are not updated when authoritative
//!   records change.

use super::file_set_repo::RepoResult;
use super::{bool_to_int, ensure_connection_ready, parse_flag, parse_uuid};
use crate::model::file_set::{FileSet, FileSetId, ParentId, ParentWork};
use crate::model::projection::{FileSetDocument, IndexedParentProjection};
use rusqlite::{params, Connection, OptionalExtension};

/// Read-only lookup of indexed projections.
pub trait ParentIndex {
    fn find_parent_projection(&self, id: ParentId) -> RepoResult<Option<IndexedParentProjection>>;
    fn find_file_set_document(&self, id: FileSetId) -> RepoResult<Option<FileSetDocument>>;
}

/// SQLite-backed index over `parent_index` and `file_set_index`.
pub struct SqliteParentIndex<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParentIndex<'conn> {
    /// Constructs an index reader from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Snapshots `parent` into the index as of `indexed_at`.
    pub fn index_parent(&self, parent: &ParentWork, indexed_at: i64) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO parent_index (parent_uuid, title, suppressed, indexed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (parent_uuid) DO UPDATE SET
                title = excluded.title,
                suppressed = excluded.suppressed,
                indexed_at = excluded.indexed_at;",
            params![
                parent.id.to_string(),
                parent.title.as_str(),
                bool_to_int(parent.suppressed),
                indexed_at,
            ],
        )?;
        Ok(())
    }

    /// Snapshots `file_set` into the index as of `indexed_at`.
    pub fn index_file_set(&self, file_set: &FileSet, indexed_at: i64) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO file_set_index (file_set_uuid, parent_uuid, title, indexed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (file_set_uuid) DO UPDATE SET
                parent_uuid = excluded.parent_uuid,
                title = excluded.title,
                indexed_at = excluded.indexed_at;",
            params![
                file_set.id.to_string(),
                file_set.parent_id.map(|id| id.to_string()),
                file_set.attribute("title"),
                indexed_at,
            ],
        )?;
        Ok(())
    }

    /// Drops a parent projection, as a reindex does after parent deletion.
    pub fn remove_parent(&self, id: ParentId) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM parent_index WHERE parent_uuid = ?1;",
            [id.to_string()],
        )?;
        Ok(())
    }
}

impl ParentIndex for SqliteParentIndex<'_> {
    fn find_parent_projection(&self, id: ParentId) -> RepoResult<Option<IndexedParentProjection>> {
        let row = self
            .conn
            .query_row(
                "SELECT parent_uuid, title, suppressed, indexed_at
                 FROM parent_index
                 WHERE parent_uuid = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>("parent_uuid")?,
                        row.get::<_, String>("title")?,
                        row.get::<_, i64>("suppressed")?,
                        row.get::<_, i64>("indexed_at")?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((uuid, title, suppressed, indexed_at)) => Ok(Some(IndexedParentProjection {
                id: parse_uuid(&uuid, "parent_index.parent_uuid")?,
                title,
                suppressed: parse_flag(suppressed, "parent_index.suppressed")?,
                indexed_at,
            })),
            None => Ok(None),
        }
    }

    fn find_file_set_document(&self, id: FileSetId) -> RepoResult<Option<FileSetDocument>> {
        let row = self
            .conn
            .query_row(
                "SELECT file_set_uuid, parent_uuid, title, indexed_at
                 FROM file_set_index
                 WHERE file_set_uuid = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>("file_set_uuid")?,
                        row.get::<_, Option<String>>("parent_uuid")?,
                        row.get::<_, Option<String>>("title")?,
                        row.get::<_, i64>("indexed_at")?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((uuid, parent_uuid, title, indexed_at)) => Ok(Some(FileSetDocument {
                id: parse_uuid(&uuid, "file_set_index.file_set_uuid")?,
                parent_id: parent_uuid
                    .map(|value| parse_uuid(&value, "file_set_index.parent_uuid"))
                    .transpose()?,
                title,
                indexed_at,
            })),
            None => Ok(None),
        }
    }
}
