//! Unit tests for the error types' user-facing messages and status mapping.

use rstest::rstest;
use tagshelf::types::errors::{
    BookmarkError, FieldError, RecordFailure, ScoringError, SettingsError, StoreError,
    ValidationError,
};

#[rstest]
#[case(ScoringError::MissingBookmarkId, 400, "Bookmark ID is required")]
#[case(ScoringError::BookmarkNotFound(9), 404, "Bookmark not found")]
#[case(ScoringError::Lookup("Store database error: disk I/O error".into()), 500, "Store database error: disk I/O error")]
#[case(ScoringError::MissingCredential, 500, "OpenAI API key not configured")]
#[case(ScoringError::Upstream("quota exceeded".into()), 500, "OpenAI API error: quota exceeded")]
#[case(ScoringError::MalformedResponse, 500, "Failed to parse OpenAI response")]
#[case(ScoringError::InvalidScore, 500, "Invalid score received from OpenAI")]
#[case(ScoringError::Persist("Failed to update bookmark score".into()), 500, "Failed to update bookmark score")]
fn test_scoring_error_status_and_message(
    #[case] err: ScoringError,
    #[case] status: u16,
    #[case] message: &str,
) {
    assert_eq!(err.status_code(), status);
    assert_eq!(err.to_string(), message);
}

#[test]
fn test_remote_scoring_error_keeps_its_status() {
    let err = ScoringError::Remote {
        status: 502,
        message: "Scoring function returned HTTP 502".into(),
    };
    assert_eq!(err.status_code(), 502);
    assert_eq!(err.to_string(), "Scoring function returned HTTP 502");
}

#[test]
fn test_record_failures_join_messages() {
    let err = StoreError::RecordFailures(vec![
        RecordFailure { index: 0, message: "URL: invalid".into() },
        RecordFailure { index: 2, message: "Title: too long".into() },
    ]);
    assert_eq!(err.to_string(), "URL: invalid; Title: too long");
}

#[test]
fn test_store_error_messages() {
    assert_eq!(StoreError::BookmarkNotFound(3).to_string(), "Bookmark not found: 3");
    assert_eq!(StoreError::FolderNotFound(4).to_string(), "Folder not found: 4");
    assert_eq!(
        StoreError::Transport("connection refused".into()).to_string(),
        "Record store unreachable: connection refused"
    );
}

#[test]
fn test_validation_error_summary_and_lookup() {
    let err = ValidationError {
        errors: vec![
            FieldError { field: "title".into(), message: "Title is required".into() },
            FieldError { field: "url".into(), message: "Please enter a valid URL".into() },
        ],
    };
    assert_eq!(err.to_string(), "Title is required; Please enter a valid URL");
    assert_eq!(err.message_for("url"), Some("Please enter a valid URL"));
    assert_eq!(err.message_for("description"), None);
}

#[test]
fn test_bookmark_error_is_transparent() {
    let err: BookmarkError = StoreError::BookmarkNotFound(1).into();
    assert_eq!(err.to_string(), "Bookmark not found: 1");
}

#[test]
fn test_settings_error_messages() {
    assert_eq!(
        SettingsError::InvalidKey("a.b".into()).to_string(),
        "Invalid settings key: a.b"
    );
    assert_eq!(
        SettingsError::IoError("denied".into()).to_string(),
        "Settings IO error: denied"
    );
}
