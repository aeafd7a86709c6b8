//! Record-store backends.
//!
//! [`RecordStore`] is the one interface the bookmark manager and the scoring
//! function talk to. Three interchangeable backends implement it:
//!
//! - [`memory::MemoryStore`]: owned in-memory state, for demos and tests
//! - [`sqlite::SqliteStore`]: durable local file via `rusqlite`
//! - [`remote::RemoteStore`]: hosted record API over HTTP
//!
//! Which one is used is decided once, at startup, by [`open_store`].

pub mod adapter;
pub mod memory;
pub mod remote;
pub mod sqlite;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::info;

use crate::database::Database;
use crate::types::bookmark::{Bookmark, BookmarkDraft, Folder, FolderDraft};
use crate::types::errors::{RecordFailure, StoreError};
use crate::types::settings::{StorageSettings, StoreBackend};

pub use memory::MemoryStore;
pub use remote::RemoteStore;
pub use sqlite::SqliteStore;

/// Result of a multi-record write: what was stored, and what was not.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<T> {
    pub applied: Vec<T>,
    pub failures: Vec<RecordFailure>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            applied: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// CRUD over the two record kinds, bookmarks and folders.
///
/// Drafts handed to a store have already been validated. Deleting a folder
/// must leave the bookmarks that referenced it in place with no folder.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend label used in logs.
    fn backend_name(&self) -> &'static str;

    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StoreError>;
    async fn get_bookmark(&self, id: i64) -> Result<Bookmark, StoreError>;
    async fn create_bookmark(&self, draft: &BookmarkDraft) -> Result<Bookmark, StoreError>;
    async fn update_bookmark(&self, id: i64, draft: &BookmarkDraft) -> Result<Bookmark, StoreError>;
    /// Writes only the quality score; other fields and `updated_at` are untouched.
    async fn set_score(&self, id: i64, score: f64) -> Result<(), StoreError>;
    async fn delete_bookmark(&self, id: i64) -> Result<(), StoreError>;

    async fn list_folders(&self) -> Result<Vec<Folder>, StoreError>;
    async fn create_folder(&self, draft: &FolderDraft) -> Result<Folder, StoreError>;
    async fn update_folder(&self, id: i64, draft: &FolderDraft) -> Result<Folder, StoreError>;
    async fn delete_folder(&self, id: i64) -> Result<(), StoreError>;

    /// Creates several bookmarks. Records that fail are reported individually;
    /// the rest are kept.
    async fn create_bookmarks(
        &self,
        drafts: &[BookmarkDraft],
    ) -> Result<BatchOutcome<Bookmark>, StoreError> {
        let mut outcome = BatchOutcome::default();
        for (index, draft) in drafts.iter().enumerate() {
            match self.create_bookmark(draft).await {
                Ok(bookmark) => outcome.applied.push(bookmark),
                Err(e) => outcome.failures.push(RecordFailure {
                    index,
                    message: e.to_string(),
                }),
            }
        }
        Ok(outcome)
    }
}

/// Returns the current UNIX timestamp in seconds.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Builds the backend selected in `settings`.
///
/// `data_dir` is where the SQLite file goes when no explicit path is configured.
pub fn open_store(
    settings: &StorageSettings,
    data_dir: &Path,
) -> Result<Arc<dyn RecordStore>, StoreError> {
    let store: Arc<dyn RecordStore> = match settings.backend {
        StoreBackend::Memory => Arc::new(
            MemoryStore::new().with_latency(Duration::from_millis(settings.memory_latency_ms)),
        ),
        StoreBackend::Sqlite => {
            let path = settings
                .database_path
                .as_deref()
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("tagshelf.db"));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Database(e.to_string()))?;
            }
            Arc::new(SqliteStore::new(Database::open(&path)?))
        }
        StoreBackend::Remote => Arc::new(RemoteStore::from_settings(&settings.remote)?),
    };
    info!(backend = store.backend_name(), "record store ready");
    Ok(store)
}
