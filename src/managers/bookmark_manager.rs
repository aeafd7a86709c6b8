//! Bookmark Manager for tagshelf.
//!
//! Owns the loaded bookmark and folder collections together with the record
//! store they came from. Mutations go to the store first and are mirrored
//! into local state only when the store accepts them; a failed call leaves
//! local state exactly as it was. Derived views (filtering, facets, counts)
//! are recomputed from local state on every call.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::services::aggregator;
use crate::services::notifier::Notifier;
use crate::services::scoring::ScoringFlow;
use crate::services::validation::{validate_bookmark, validate_folder};
use crate::store::{BatchOutcome, RecordStore};
use crate::types::bookmark::{
    Bookmark, BookmarkCounts, BookmarkDraft, BookmarkView, FilterState, Folder, FolderDraft,
    TagFacet,
};
use crate::types::errors::{BookmarkError, RecordFailure};
use crate::types::score::{ScoreAttempt, ScoreState};

/// In-memory view of the library plus the store that backs it.
pub struct BookmarkManager {
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    bookmarks: Vec<Bookmark>,
    folders: Vec<Folder>,
    last_error: Option<String>,
    revision: u64,
}

impl BookmarkManager {
    /// Creates an empty manager. Call [`BookmarkManager::load_data`] to populate it.
    pub fn new(store: Arc<dyn RecordStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            bookmarks: Vec::new(),
            folders: Vec::new(),
            last_error: None,
            revision: 0,
        }
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn bookmark(&self, id: i64) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    /// Message of the most recent failed load, cleared by the next successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Increments on every change to local state; usable as a memoization key.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn fail<T>(&self, message: &str, err: impl Into<BookmarkError>) -> Result<T, BookmarkError> {
        let err = err.into();
        warn!(error = %err, "{}", message);
        self.notifier.error(message);
        Err(err)
    }

    // ─── Loading ───

    /// Replaces both collections with a fresh read from the store.
    ///
    /// Bookmarks and folders are fetched concurrently. If either read fails,
    /// the previous collections are kept.
    pub async fn load_data(&mut self) -> Result<(), BookmarkError> {
        let (bookmarks, folders) =
            match tokio::try_join!(self.store.list_bookmarks(), self.store.list_folders()) {
                Ok(loaded) => loaded,
                Err(e) => {
                    self.last_error = Some("Failed to load bookmarks".to_string());
                    return self.fail("Failed to load bookmarks", e);
                }
            };

        info!(
            bookmarks = bookmarks.len(),
            folders = folders.len(),
            backend = self.store.backend_name(),
            "library loaded"
        );
        self.bookmarks = bookmarks;
        self.folders = folders;
        self.last_error = None;
        self.touch();
        Ok(())
    }

    // ─── Bookmarks ───

    /// Validates and stores a new bookmark; it is placed at the front of the list.
    pub async fn add_bookmark(&mut self, draft: &BookmarkDraft) -> Result<Bookmark, BookmarkError> {
        let draft = validate_bookmark(draft)?;
        let bookmark = match self.store.create_bookmark(&draft).await {
            Ok(b) => b,
            Err(e) => return self.fail("Failed to add bookmark", e),
        };

        debug!(id = bookmark.id, "bookmark added");
        self.bookmarks.insert(0, bookmark.clone());
        self.touch();
        self.notifier.success("Bookmark added successfully!");
        Ok(bookmark)
    }

    /// Validates and replaces the editable fields of an existing bookmark.
    pub async fn update_bookmark(
        &mut self,
        id: i64,
        draft: &BookmarkDraft,
    ) -> Result<Bookmark, BookmarkError> {
        let draft = validate_bookmark(draft)?;
        let updated = match self.store.update_bookmark(id, &draft).await {
            Ok(b) => b,
            Err(e) => return self.fail("Failed to update bookmark", e),
        };

        match self.bookmarks.iter_mut().find(|b| b.id == id) {
            Some(slot) => *slot = updated.clone(),
            None => self.bookmarks.insert(0, updated.clone()),
        }
        self.touch();
        self.notifier.success("Bookmark updated successfully!");
        Ok(updated)
    }

    pub async fn delete_bookmark(&mut self, id: i64) -> Result<(), BookmarkError> {
        if let Err(e) = self.store.delete_bookmark(id).await {
            return self.fail("Failed to delete bookmark", e);
        }

        self.bookmarks.retain(|b| b.id != id);
        self.touch();
        self.notifier.success("Bookmark deleted successfully!");
        Ok(())
    }

    /// Stores several bookmarks in one batch.
    ///
    /// Drafts that fail validation are reported without being sent. Records the
    /// store rejects are reported one notification each; everything that was
    /// stored is added to local state. Failure indices refer to `drafts`.
    pub async fn import_bookmarks(
        &mut self,
        drafts: &[BookmarkDraft],
    ) -> Result<BatchOutcome<Bookmark>, BookmarkError> {
        let mut outcome = BatchOutcome::default();
        let mut valid = Vec::with_capacity(drafts.len());
        let mut positions = Vec::with_capacity(drafts.len());

        for (index, draft) in drafts.iter().enumerate() {
            match validate_bookmark(draft) {
                Ok(d) => {
                    valid.push(d);
                    positions.push(index);
                }
                Err(e) => outcome.failures.push(RecordFailure {
                    index,
                    message: e.to_string(),
                }),
            }
        }

        if !valid.is_empty() {
            let stored = match self.store.create_bookmarks(&valid).await {
                Ok(stored) => stored,
                Err(e) => return self.fail("Failed to import bookmarks", e),
            };
            for mut failure in stored.failures {
                failure.index = positions.get(failure.index).copied().unwrap_or(failure.index);
                outcome.failures.push(failure);
            }
            outcome.applied = stored.applied;
        }
        outcome.failures.sort_by_key(|f| f.index);

        for failure in &outcome.failures {
            self.notifier.error(&failure.message);
        }
        if !outcome.applied.is_empty() {
            for bookmark in outcome.applied.iter().rev() {
                self.bookmarks.insert(0, bookmark.clone());
            }
            self.touch();
            self.notifier.success(&format!(
                "Imported {} bookmark{}",
                outcome.applied.len(),
                if outcome.applied.len() == 1 { "" } else { "s" }
            ));
        }
        Ok(outcome)
    }

    // ─── Folders ───

    pub async fn add_folder(&mut self, draft: &FolderDraft) -> Result<Folder, BookmarkError> {
        let draft = validate_folder(draft)?;
        let folder = match self.store.create_folder(&draft).await {
            Ok(f) => f,
            Err(e) => return self.fail("Failed to create folder", e),
        };

        self.folders.push(folder.clone());
        self.touch();
        self.notifier.success("Folder created successfully!");
        Ok(folder)
    }

    pub async fn update_folder(&mut self, id: i64, draft: &FolderDraft) -> Result<Folder, BookmarkError> {
        let draft = validate_folder(draft)?;
        let updated = match self.store.update_folder(id, &draft).await {
            Ok(f) => f,
            Err(e) => return self.fail("Failed to update folder", e),
        };

        match self.folders.iter_mut().find(|f| f.id == id) {
            Some(slot) => *slot = updated.clone(),
            None => self.folders.push(updated.clone()),
        }
        self.touch();
        self.notifier.success("Folder updated successfully!");
        Ok(updated)
    }

    /// Deletes a folder. Its bookmarks stay, with their folder reference cleared.
    pub async fn delete_folder(&mut self, id: i64) -> Result<(), BookmarkError> {
        if let Err(e) = self.store.delete_folder(id).await {
            return self.fail("Failed to delete folder", e);
        }

        self.folders.retain(|f| f.id != id);
        for bookmark in self.bookmarks.iter_mut().filter(|b| b.folder_id == Some(id)) {
            bookmark.folder_id = None;
        }
        self.touch();
        self.notifier.success("Folder deleted successfully!");
        Ok(())
    }

    // ─── Derived views ───

    /// Text search over the loaded bookmarks, newest first. An empty query returns everything.
    pub fn search_bookmarks(&self, query: &str) -> Vec<&Bookmark> {
        let filter = FilterState {
            query: query.to_string(),
            ..FilterState::default()
        };
        aggregator::filter_bookmarks(&self.bookmarks, &filter)
    }

    pub fn view(&self, filter: &FilterState) -> BookmarkView<'_> {
        aggregator::build_view(&self.bookmarks, &self.folders, filter)
    }

    pub fn tags(&self) -> Vec<TagFacet> {
        aggregator::tag_facets(&self.bookmarks)
    }

    pub fn counts(&self) -> BookmarkCounts {
        aggregator::bookmark_counts(&self.bookmarks, &self.folders)
    }

    // ─── Scoring ───

    /// Runs one scoring attempt and applies its outcome.
    ///
    /// Holding `&mut self` for the whole call serializes it with other
    /// mutations. Callers that want scoring to overlap other work can run
    /// [`ScoringFlow::run`] themselves and pass the result to
    /// [`BookmarkManager::apply_score_attempt`].
    pub async fn score_bookmark(&mut self, flow: &ScoringFlow, id: i64) -> ScoreAttempt {
        let attempt = flow.run(id).await;
        self.apply_score_attempt(&attempt).await;
        attempt
    }

    /// Reacts to a finished scoring attempt.
    ///
    /// `Scored` triggers a full reload so the new score becomes visible;
    /// `Failed` notifies the reason and leaves local data untouched.
    pub async fn apply_score_attempt(&mut self, attempt: &ScoreAttempt) {
        match &attempt.state {
            ScoreState::Scored(_) => {
                self.notifier.success("Bookmark scored successfully");
                // a failed reload notifies on its own and keeps the old data
                let _ = self.load_data().await;
            }
            ScoreState::Failed { reason } => self.notifier.error(reason),
            ScoreState::Idle | ScoreState::Requesting => {
                debug!(attempt = %attempt.attempt_id, "ignoring unfinished scoring attempt");
            }
        }
    }
}

