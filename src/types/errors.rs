use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// === StoreError ===

/// A single record that a batch write could not apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordFailure {
    /// Position of the record within the submitted batch.
    pub index: usize,
    pub message: String,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}: {}", self.index, self.message)
    }
}

/// Errors raised by a record-store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Bookmark with the given ID was not found.
    #[error("Bookmark not found: {0}")]
    BookmarkNotFound(i64),
    /// Folder with the given ID was not found.
    #[error("Folder not found: {0}")]
    FolderNotFound(i64),
    /// Local database operation failed.
    #[error("Store database error: {0}")]
    Database(String),
    /// The remote store could not be reached.
    #[error("Record store unreachable: {0}")]
    Transport(String),
    /// The remote store answered with `success: false`.
    #[error("Record store rejected request: {0}")]
    Rejected(String),
    /// Individual records of a write failed.
    #[error("{}", join_failures(.0))]
    RecordFailures(Vec<RecordFailure>),
    /// A record could not be translated into the internal representation.
    #[error("Malformed record: {0}")]
    Malformed(String),
}

fn join_failures(failures: &[RecordFailure]) -> String {
    failures
        .iter()
        .map(|f| f.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

// === ValidationError ===

/// A problem with one input field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Input rejected before any store call was made. Carries one entry per bad field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.summary())]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// === BookmarkError ===

/// Errors surfaced by the bookmark manager.
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// === CompletionError ===

/// Errors from the text-completion provider.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The request never produced an HTTP response.
    #[error("Completion request failed: {0}")]
    Transport(String),
    /// The provider answered with a non-success status.
    #[error("{0}")]
    Api(String),
    /// The provider answered 2xx but the body had no usable completion.
    #[error("Malformed completion response: {0}")]
    Malformed(String),
}

// === ScoringError ===

/// Errors that end a scoring attempt. The display text is the user-facing reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("Bookmark ID is required")]
    MissingBookmarkId,
    #[error("Bookmark not found")]
    BookmarkNotFound(i64),
    /// The store failed while looking the bookmark up.
    #[error("{0}")]
    Lookup(String),
    #[error("OpenAI API key not configured")]
    MissingCredential,
    #[error("OpenAI API error: {0}")]
    Upstream(String),
    #[error("Failed to parse OpenAI response")]
    MalformedResponse,
    #[error("Invalid score received from OpenAI")]
    InvalidScore,
    #[error("{0}")]
    Persist(String),
    #[error("Scoring request failed: {0}")]
    Transport(String),
    /// A non-success answer from a remote scoring function.
    #[error("{message}")]
    Remote { status: u16, message: String },
}

impl ScoringError {
    /// The HTTP status the scoring function answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ScoringError::MissingBookmarkId => 400,
            ScoringError::BookmarkNotFound(_) => 404,
            ScoringError::Remote { status, .. } => *status,
            _ => 500,
        }
    }
}

// === SettingsError ===

/// Errors related to loading and saving application settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read or write the settings file.
    #[error("Settings IO error: {0}")]
    IoError(String),
    /// The settings file could not be parsed or serialized.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The requested settings key does not exist.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided value is not valid for the key.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}
