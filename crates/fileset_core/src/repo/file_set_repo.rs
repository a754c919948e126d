//! File set and parent work repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over authoritative `parent_works` and `file_sets`.
//! - Own descriptive attribute persistence (`file_set_attributes`).
//!
//! # Invariants
//! - Content pointers are never written here; they move only with versions.
//! - Attribute merges are applied in a single transaction.
//! - Deleting a file set cascades to its attributes and versions.

use super::{bool_to_int, ensure_connection_ready, parse_flag, parse_uuid};
use crate::db::DbError;
use crate::model::file_set::{ContentRef, FileSet, FileSetId, ParentId, ParentWork};
use crate::model::version::VersionHistoryError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for file set persistence and index queries.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    FileSetNotFound(FileSetId),
    ParentNotFound(ParentId),
    VersionNotFound { file_set_id: FileSetId, label: String },
    BlobNotFound(ContentRef),
    /// Persisted or appended versions violate history ordering.
    History(VersionHistoryError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl RepoError {
    /// Returns whether this error is a transient storage condition.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Db(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::FileSetNotFound(id) => write!(f, "file set not found: {id}"),
            Self::ParentNotFound(id) => write!(f, "parent work not found: {id}"),
            Self::VersionNotFound { file_set_id, label } => {
                write!(f, "version `{label}` not found for file set {file_set_id}")
            }
            Self::BlobNotFound(id) => write!(f, "blob not found: {id}"),
            Self::History(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "file set repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::History(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<VersionHistoryError> for RepoError {
    fn from(value: VersionHistoryError) -> Self {
        Self::History(value)
    }
}

/// Repository interface for authoritative file set and parent records.
pub trait FileSetRepository {
    fn create_parent(&self, parent: &ParentWork) -> RepoResult<ParentId>;
    fn get_parent(&self, id: ParentId) -> RepoResult<Option<ParentWork>>;
    /// Changes the authoritative workflow flag. Used by workflow integrations.
    fn set_parent_suppressed(&self, id: ParentId, suppressed: bool) -> RepoResult<()>;
    /// Creates a file set without content; content attaches through versions.
    fn create_file_set(&self, file_set: &FileSet) -> RepoResult<FileSetId>;
    fn get_file_set(&self, id: FileSetId) -> RepoResult<Option<FileSet>>;
    /// Upserts each given attribute, leaving other attributes untouched.
    fn merge_attributes(
        &self,
        id: FileSetId,
        attributes: &BTreeMap<String, String>,
    ) -> RepoResult<()>;
    /// Deletes a file set, its attributes, and its version history.
    fn delete_file_set(&self, id: FileSetId) -> RepoResult<()>;
    /// Lists children of a parent work, ordered by id.
    fn list_children(&self, parent_id: ParentId) -> RepoResult<Vec<FileSetId>>;
}

/// SQLite-backed file set repository.
pub struct SqliteFileSetRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFileSetRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl FileSetRepository for SqliteFileSetRepository<'_> {
    fn create_parent(&self, parent: &ParentWork) -> RepoResult<ParentId> {
        self.conn.execute(
            "INSERT INTO parent_works (uuid, title, suppressed) VALUES (?1, ?2, ?3);",
            params![
                parent.id.to_string(),
                parent.title.as_str(),
                bool_to_int(parent.suppressed),
            ],
        )?;
        Ok(parent.id)
    }

    fn get_parent(&self, id: ParentId) -> RepoResult<Option<ParentWork>> {
        let row = self
            .conn
            .query_row(
                "SELECT uuid, title, suppressed FROM parent_works WHERE uuid = ?1;",
                [id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>("uuid")?,
                        row.get::<_, String>("title")?,
                        row.get::<_, i64>("suppressed")?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((uuid, title, suppressed)) => Ok(Some(ParentWork {
                id: parse_uuid(&uuid, "parent_works.uuid")?,
                title,
                suppressed: parse_flag(suppressed, "parent_works.suppressed")?,
            })),
            None => Ok(None),
        }
    }

    fn set_parent_suppressed(&self, id: ParentId, suppressed: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE parent_works
             SET
                suppressed = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), bool_to_int(suppressed)],
        )?;
        if changed == 0 {
            return Err(RepoError::ParentNotFound(id));
        }
        Ok(())
    }

    fn create_file_set(&self, file_set: &FileSet) -> RepoResult<FileSetId> {
        if file_set.current_content.is_some() || file_set.current_version.is_some() {
            return Err(RepoError::InvalidData(
                "new file sets must not carry content; append a version instead".to_string(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO file_sets (uuid, parent_uuid, file_name) VALUES (?1, ?2, ?3);",
            params![
                file_set.id.to_string(),
                file_set.parent_id.map(|id| id.to_string()),
                file_set.file_name.as_deref(),
            ],
        )?;
        for (name, value) in &file_set.attributes {
            tx.execute(
                "INSERT INTO file_set_attributes (file_set_uuid, name, value)
                 VALUES (?1, ?2, ?3);",
                params![file_set.id.to_string(), name.as_str(), value.as_str()],
            )?;
        }
        tx.commit()?;

        Ok(file_set.id)
    }

    fn get_file_set(&self, id: FileSetId) -> RepoResult<Option<FileSet>> {
        let id_text = id.to_string();
        let row = self
            .conn
            .query_row(
                "SELECT uuid, parent_uuid, file_name, current_content, current_version
                 FROM file_sets
                 WHERE uuid = ?1;",
                [id_text.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>("uuid")?,
                        row.get::<_, Option<String>>("parent_uuid")?,
                        row.get::<_, Option<String>>("file_name")?,
                        row.get::<_, Option<String>>("current_content")?,
                        row.get::<_, Option<String>>("current_version")?,
                    ))
                },
            )
            .optional()?;

        let Some((uuid, parent_uuid, file_name, current_content, current_version)) = row else {
            return Ok(None);
        };

        Ok(Some(FileSet {
            id: parse_uuid(&uuid, "file_sets.uuid")?,
            parent_id: parent_uuid
                .map(|value| parse_uuid(&value, "file_sets.parent_uuid"))
                .transpose()?,
            file_name,
            current_content: current_content
                .map(|value| parse_uuid(&value, "file_sets.current_content"))
                .transpose()?,
            current_version,
            attributes: load_attributes(self.conn, &id_text)?,
        }))
    }

    fn merge_attributes(
        &self,
        id: FileSetId,
        attributes: &BTreeMap<String, String>,
    ) -> RepoResult<()> {
        let id_text = id.to_string();
        let tx = self.conn.unchecked_transaction()?;

        let changed = tx.execute(
            "UPDATE file_sets
             SET updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id_text.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::FileSetNotFound(id));
        }

        for (name, value) in attributes {
            tx.execute(
                "INSERT INTO file_set_attributes (file_set_uuid, name, value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (file_set_uuid, name) DO UPDATE SET value = excluded.value;",
                params![id_text.as_str(), name.as_str(), value.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_file_set(&self, id: FileSetId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM file_sets WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::FileSetNotFound(id));
        }
        Ok(())
    }

    fn list_children(&self, parent_id: ParentId) -> RepoResult<Vec<FileSetId>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid FROM file_sets WHERE parent_uuid = ?1 ORDER BY uuid ASC;",
        )?;
        let mut rows = stmt.query([parent_id.to_string()])?;
        let mut children = Vec::new();
        while let Some(row) = rows.next()? {
            let uuid: String = row.get(0)?;
            children.push(parse_uuid(&uuid, "file_sets.uuid")?);
        }
        Ok(children)
    }
}

fn load_attributes(conn: &Connection, file_set_uuid: &str) -> RepoResult<BTreeMap<String, String>> {
    let mut stmt = conn.prepare(
        "SELECT name, value
         FROM file_set_attributes
         WHERE file_set_uuid = ?1
         ORDER BY name ASC;",
    )?;
    let mut rows = stmt.query([file_set_uuid])?;
    let mut attributes = BTreeMap::new();
    while let Some(row) = rows.next()? {
        attributes.insert(row.get::<_, String>(0)?, row.get::<_, String>(1)?);
    }
    Ok(attributes)
}
