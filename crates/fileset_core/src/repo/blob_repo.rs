//! Blob store contract and SQLite implementation.
//!
//! Blobs are opaque byte sinks. A written blob is never mutated; blobs left
//! unreferenced by a failed version append are tolerated.

use super::file_set_repo::{RepoError, RepoResult};
use super::ensure_connection_ready;
use crate::model::file_set::ContentRef;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

/// Write-once byte storage addressed by `ContentRef`.
pub trait BlobStore {
    fn write(&self, bytes: &[u8]) -> RepoResult<ContentRef>;
    fn read(&self, content_ref: ContentRef) -> RepoResult<Vec<u8>>;
}

/// SQLite-backed blob store over the `blobs` table.
pub struct SqliteBlobStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBlobStore<'conn> {
    /// Constructs a blob store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Counts stored blobs, referenced or not.
    pub fn blob_count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM blobs;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative blob count `{count}`")))
    }
}

impl BlobStore for SqliteBlobStore<'_> {
    fn write(&self, bytes: &[u8]) -> RepoResult<ContentRef> {
        let content_ref = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO blobs (uuid, bytes, byte_len) VALUES (?1, ?2, ?3);",
            params![content_ref.to_string(), bytes, bytes.len() as i64],
        )?;
        Ok(content_ref)
    }

    fn read(&self, content_ref: ContentRef) -> RepoResult<Vec<u8>> {
        self.conn
            .query_row(
                "SELECT bytes FROM blobs WHERE uuid = ?1;",
                [content_ref.to_string()],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?
            .ok_or(RepoError::BlobNotFound(content_ref))
    }
}
