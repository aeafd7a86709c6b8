//! In-memory record store.
//!
//! State lives inside the store value itself, so each owner gets its own
//! independent collections. Ids only ever grow; a deleted record's id is
//! never handed out again.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{unix_now, RecordStore};
use crate::types::bookmark::{Bookmark, BookmarkDraft, Folder, FolderDraft};
use crate::types::errors::StoreError;

#[derive(Debug, Default)]
struct MemoryState {
    bookmarks: Vec<Bookmark>,
    folders: Vec<Folder>,
    last_bookmark_id: i64,
    last_folder_id: i64,
}

/// Record store holding bookmarks and folders in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    latency: Duration,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given records.
    pub fn with_seed(bookmarks: Vec<Bookmark>, folders: Vec<Folder>) -> Self {
        let last_bookmark_id = bookmarks.iter().map(|b| b.id).max().unwrap_or(0);
        let last_folder_id = folders.iter().map(|f| f.id).max().unwrap_or(0);
        Self {
            state: Mutex::new(MemoryState {
                bookmarks,
                folders,
                last_bookmark_id,
                last_folder_id,
            }),
            latency: Duration::ZERO,
        }
    }

    /// Delays every call by `latency`, imitating a network round trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Database(format!("memory store poisoned: {}", e)))
    }

    fn check_folder(state: &MemoryState, folder_id: Option<i64>) -> Result<(), StoreError> {
        match folder_id {
            Some(fid) if !state.folders.iter().any(|f| f.id == fid) => {
                Err(StoreError::FolderNotFound(fid))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StoreError> {
        self.pause().await;
        Ok(self.lock()?.bookmarks.clone())
    }

    async fn get_bookmark(&self, id: i64) -> Result<Bookmark, StoreError> {
        self.pause().await;
        self.lock()?
            .bookmarks
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(StoreError::BookmarkNotFound(id))
    }

    async fn create_bookmark(&self, draft: &BookmarkDraft) -> Result<Bookmark, StoreError> {
        self.pause().await;
        let mut state = self.lock()?;
        Self::check_folder(&state, draft.folder_id)?;

        state.last_bookmark_id += 1;
        let id = state.last_bookmark_id;
        let now = unix_now();
        let bookmark = Bookmark {
            id,
            title: draft.title.clone(),
            url: draft.url.clone(),
            description: draft.description.clone(),
            folder_id: draft.folder_id,
            tags: draft.tags.clone(),
            created_at: now,
            updated_at: now,
            score: None,
        };
        state.bookmarks.push(bookmark.clone());
        debug!(id, "memory: bookmark created");
        Ok(bookmark)
    }

    async fn update_bookmark(&self, id: i64, draft: &BookmarkDraft) -> Result<Bookmark, StoreError> {
        self.pause().await;
        let mut state = self.lock()?;
        Self::check_folder(&state, draft.folder_id)?;

        let bookmark = state
            .bookmarks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::BookmarkNotFound(id))?;
        bookmark.title = draft.title.clone();
        bookmark.url = draft.url.clone();
        bookmark.description = draft.description.clone();
        bookmark.folder_id = draft.folder_id;
        bookmark.tags = draft.tags.clone();
        bookmark.updated_at = unix_now();
        Ok(bookmark.clone())
    }

    async fn set_score(&self, id: i64, score: f64) -> Result<(), StoreError> {
        self.pause().await;
        let mut state = self.lock()?;
        let bookmark = state
            .bookmarks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::BookmarkNotFound(id))?;
        bookmark.score = Some(score);
        Ok(())
    }

    async fn delete_bookmark(&self, id: i64) -> Result<(), StoreError> {
        self.pause().await;
        let mut state = self.lock()?;
        let index = state
            .bookmarks
            .iter()
            .position(|b| b.id == id)
            .ok_or(StoreError::BookmarkNotFound(id))?;
        state.bookmarks.remove(index);
        Ok(())
    }

    async fn list_folders(&self) -> Result<Vec<Folder>, StoreError> {
        self.pause().await;
        Ok(self.lock()?.folders.clone())
    }

    async fn create_folder(&self, draft: &FolderDraft) -> Result<Folder, StoreError> {
        self.pause().await;
        let mut state = self.lock()?;
        state.last_folder_id += 1;
        let id = state.last_folder_id;
        let folder = Folder {
            id,
            name: draft.name.clone(),
            color: draft.color.unwrap_or_default(),
            created_at: unix_now(),
        };
        state.folders.push(folder.clone());
        Ok(folder)
    }

    async fn update_folder(&self, id: i64, draft: &FolderDraft) -> Result<Folder, StoreError> {
        self.pause().await;
        let mut state = self.lock()?;
        let folder = state
            .folders
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(StoreError::FolderNotFound(id))?;
        folder.name = draft.name.clone();
        folder.color = draft.color.unwrap_or_default();
        Ok(folder.clone())
    }

    async fn delete_folder(&self, id: i64) -> Result<(), StoreError> {
        self.pause().await;
        let mut state = self.lock()?;
        let index = state
            .folders
            .iter()
            .position(|f| f.id == id)
            .ok_or(StoreError::FolderNotFound(id))?;
        state.folders.remove(index);
        for bookmark in state.bookmarks.iter_mut().filter(|b| b.folder_id == Some(id)) {
            bookmark.folder_id = None;
        }
        Ok(())
    }
}
