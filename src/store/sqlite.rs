//! SQLite record store.
//!
//! Implements [`RecordStore`] on top of [`Database`]. Statements run while
//! the connection lock is held and never across an `.await`.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{unix_now, RecordStore};
use crate::database::Database;
use crate::types::bookmark::{Bookmark, BookmarkDraft, Folder, FolderColor, FolderDraft};
use crate::types::errors::StoreError;

const BOOKMARK_COLUMNS: &str =
    "id, title, url, description, folder_id, tags, created_at, updated_at, score";

/// Bookmark store backed by a SQLite database.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Creates a new `SqliteStore` that owns the given database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Direct access to the underlying database, mainly for inspection in tests.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Reads a single `Bookmark` row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        let tags_json: String = row.get(5)?;
        let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Bookmark {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            description: row.get(3)?,
            folder_id: row.get(4)?,
            tags,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            score: row.get(8)?,
        })
    }

    fn row_to_folder(row: &rusqlite::Row) -> rusqlite::Result<Folder> {
        let color: String = row.get(2)?;
        Ok(Folder {
            id: row.get(0)?,
            name: row.get(1)?,
            color: color.parse().unwrap_or_default(),
            created_at: row.get(3)?,
        })
    }

    fn tags_to_json(tags: &[String]) -> Result<String, StoreError> {
        serde_json::to_string(tags).map_err(|e| StoreError::Malformed(e.to_string()))
    }

    /// Checks whether a folder with the given ID exists.
    fn folder_exists(conn: &Connection, folder_id: i64) -> Result<bool, StoreError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM folders WHERE id = ?1",
            params![folder_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn check_folder(conn: &Connection, folder_id: Option<i64>) -> Result<(), StoreError> {
        if let Some(fid) = folder_id {
            if !Self::folder_exists(conn, fid)? {
                return Err(StoreError::FolderNotFound(fid));
            }
        }
        Ok(())
    }

    fn fetch_bookmark(conn: &Connection, id: i64) -> Result<Bookmark, StoreError> {
        conn.query_row(
            &format!("SELECT {} FROM bookmarks WHERE id = ?1", BOOKMARK_COLUMNS),
            params![id],
            Self::row_to_bookmark,
        )
        .optional()?
        .ok_or(StoreError::BookmarkNotFound(id))
    }

    fn fetch_folder(conn: &Connection, id: i64) -> Result<Folder, StoreError> {
        conn.query_row(
            "SELECT id, name, color, created_at FROM folders WHERE id = ?1",
            params![id],
            Self::row_to_folder,
        )
        .optional()?
        .ok_or(StoreError::FolderNotFound(id))
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bookmarks ORDER BY created_at DESC, id DESC",
            BOOKMARK_COLUMNS
        ))?;
        let rows = stmt.query_map([], Self::row_to_bookmark)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn get_bookmark(&self, id: i64) -> Result<Bookmark, StoreError> {
        let conn = self.db.connection();
        Self::fetch_bookmark(&conn, id)
    }

    async fn create_bookmark(&self, draft: &BookmarkDraft) -> Result<Bookmark, StoreError> {
        let conn = self.db.connection();
        Self::check_folder(&conn, draft.folder_id)?;

        let now = unix_now();
        conn.execute(
            "INSERT INTO bookmarks (title, url, description, folder_id, tags, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                draft.title,
                draft.url,
                draft.description,
                draft.folder_id,
                Self::tags_to_json(&draft.tags)?,
                now,
                now
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, "sqlite: bookmark created");
        Self::fetch_bookmark(&conn, id)
    }

    async fn update_bookmark(&self, id: i64, draft: &BookmarkDraft) -> Result<Bookmark, StoreError> {
        let conn = self.db.connection();
        Self::check_folder(&conn, draft.folder_id)?;

        let affected = conn.execute(
            "UPDATE bookmarks SET title = ?1, url = ?2, description = ?3, folder_id = ?4, tags = ?5, \
             updated_at = ?6 WHERE id = ?7",
            params![
                draft.title,
                draft.url,
                draft.description,
                draft.folder_id,
                Self::tags_to_json(&draft.tags)?,
                unix_now(),
                id
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::BookmarkNotFound(id));
        }
        Self::fetch_bookmark(&conn, id)
    }

    async fn set_score(&self, id: i64, score: f64) -> Result<(), StoreError> {
        let affected = self.db.connection().execute(
            "UPDATE bookmarks SET score = ?1 WHERE id = ?2",
            params![score, id],
        )?;
        if affected == 0 {
            return Err(StoreError::BookmarkNotFound(id));
        }
        Ok(())
    }

    async fn delete_bookmark(&self, id: i64) -> Result<(), StoreError> {
        let affected = self
            .db
            .connection()
            .execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::BookmarkNotFound(id));
        }
        Ok(())
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, StoreError> {
        let conn = self.db.connection();
        let mut stmt =
            conn.prepare("SELECT id, name, color, created_at FROM folders ORDER BY id")?;
        let rows = stmt.query_map([], Self::row_to_folder)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn create_folder(&self, draft: &FolderDraft) -> Result<Folder, StoreError> {
        let conn = self.db.connection();
        let color = draft.color.unwrap_or_default();
        conn.execute(
            "INSERT INTO folders (name, color, created_at) VALUES (?1, ?2, ?3)",
            params![draft.name, color.as_str(), unix_now()],
        )?;
        Self::fetch_folder(&conn, conn.last_insert_rowid())
    }

    async fn update_folder(&self, id: i64, draft: &FolderDraft) -> Result<Folder, StoreError> {
        let conn = self.db.connection();
        let color: FolderColor = draft.color.unwrap_or_default();
        let affected = conn.execute(
            "UPDATE folders SET name = ?1, color = ?2 WHERE id = ?3",
            params![draft.name, color.as_str(), id],
        )?;
        if affected == 0 {
            return Err(StoreError::FolderNotFound(id));
        }
        Self::fetch_folder(&conn, id)
    }

    /// Deletes a folder. Bookmarks inside it have their `folder_id` set to `NULL`.
    async fn delete_folder(&self, id: i64) -> Result<(), StoreError> {
        let mut conn = self.db.connection();
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE bookmarks SET folder_id = NULL WHERE folder_id = ?1",
            params![id],
        )?;
        let affected = tx.execute("DELETE FROM folders WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::FolderNotFound(id));
        }

        tx.commit()?;
        Ok(())
    }
}
