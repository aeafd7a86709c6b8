//! Input validation for bookmark and folder drafts.
//!
//! Runs before any store call so that bad input never reaches a backend.

use url::Url;

use crate::types::bookmark::{BookmarkDraft, FolderDraft};
use crate::types::errors::{FieldError, ValidationError};

fn field_error(field: &str, message: &str) -> FieldError {
    FieldError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Trims, drops blanks and removes duplicates while keeping first occurrence.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Checks a bookmark draft and returns its normalized form.
///
/// Title and URL are trimmed, an empty description becomes `None`, and tags
/// go through [`normalize_tags`].
pub fn validate_bookmark(draft: &BookmarkDraft) -> Result<BookmarkDraft, ValidationError> {
    let mut errors = Vec::new();

    let title = draft.title.trim();
    if title.is_empty() {
        errors.push(field_error("title", "Title is required"));
    }

    let url = draft.url.trim();
    if url.is_empty() {
        errors.push(field_error("url", "URL is required"));
    } else if Url::parse(url).is_err() {
        errors.push(field_error("url", "Please enter a valid URL"));
    }

    if !errors.is_empty() {
        return Err(ValidationError { errors });
    }

    Ok(BookmarkDraft {
        title: title.to_string(),
        url: url.to_string(),
        description: draft
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        folder_id: draft.folder_id,
        tags: normalize_tags(&draft.tags),
    })
}

/// Checks a folder draft; a missing color resolves to the default palette entry.
pub fn validate_folder(draft: &FolderDraft) -> Result<FolderDraft, ValidationError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(ValidationError {
            errors: vec![field_error("name", "Folder name is required")],
        });
    }
    Ok(FolderDraft {
        name: name.to_string(),
        color: Some(draft.color.unwrap_or_default()),
    })
}
