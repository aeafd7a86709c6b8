//! Collection aggregator.
//!
//! Derives the visible bookmark list, tag facets and folder counts from the
//! in-memory collections. Everything here is a pure function of its inputs:
//! no I/O, no caching, and calling it twice on the same data yields the same
//! output.

use std::collections::HashMap;

use crate::types::bookmark::{
    Bookmark, BookmarkCounts, BookmarkView, EmptyReason, FilterState, Folder, TagFacet,
};

/// True if `query` (already lowercased) occurs in the title, URL, description or any tag.
fn matches_text(bookmark: &Bookmark, query: &str) -> bool {
    bookmark.title.to_lowercase().contains(query)
        || bookmark.url.to_lowercase().contains(query)
        || bookmark
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(query))
        || bookmark.tags.iter().any(|t| t.to_lowercase().contains(query))
}

fn matches_tags(bookmark: &Bookmark, active: &[String]) -> bool {
    bookmark.tags.iter().any(|t| active.contains(t))
}

/// Returns the bookmarks passing every active filter, newest first.
///
/// Filters compose with AND; the tag filter itself is an OR across the active
/// tags. Bookmarks created in the same second are ordered by descending id.
pub fn filter_bookmarks<'a>(bookmarks: &'a [Bookmark], filter: &FilterState) -> Vec<&'a Bookmark> {
    let query = filter.query.trim().to_lowercase();

    let mut visible: Vec<&Bookmark> = bookmarks
        .iter()
        .filter(|b| query.is_empty() || matches_text(b, &query))
        .filter(|b| filter.folder_id.is_none() || b.folder_id == filter.folder_id)
        .filter(|b| filter.tags.is_empty() || matches_tags(b, &filter.tags))
        .collect();

    visible.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    visible
}

/// Counts how many bookmarks carry each tag, most used first.
///
/// Ties keep the order in which tags were first seen.
pub fn tag_facets(bookmarks: &[Bookmark]) -> Vec<TagFacet> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut facets: Vec<TagFacet> = Vec::new();

    for tag in bookmarks.iter().flat_map(|b| b.tags.iter()) {
        match index.get(tag.as_str()) {
            Some(&i) => facets[i].count += 1,
            None => {
                index.insert(tag.as_str(), facets.len());
                facets.push(TagFacet {
                    name: tag.clone(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable, so first-seen order survives among equal counts
    facets.sort_by(|a, b| b.count.cmp(&a.count));
    facets
}

/// Total bookmark count and per-folder counts; folders without bookmarks report 0.
pub fn bookmark_counts(bookmarks: &[Bookmark], folders: &[Folder]) -> BookmarkCounts {
    let mut counts = BookmarkCounts {
        total: bookmarks.len(),
        folders: folders.iter().map(|f| (f.id, 0)).collect(),
    };

    for folder_id in bookmarks.iter().filter_map(|b| b.folder_id) {
        if let Some(n) = counts.folders.get_mut(&folder_id) {
            *n += 1;
        }
    }
    counts
}

/// Filters the library and labels the result the way the list header shows it.
pub fn build_view<'a>(
    bookmarks: &'a [Bookmark],
    folders: &[Folder],
    filter: &FilterState,
) -> BookmarkView<'a> {
    let visible = filter_bookmarks(bookmarks, filter);
    let n = visible.len();

    let folder_name = filter
        .folder_id
        .and_then(|id| folders.iter().find(|f| f.id == id))
        .map(|f| f.name.as_str());

    let query = filter.query.trim();
    let heading = if let Some(name) = folder_name {
        format!("{} ({})", name, n)
    } else if !filter.tags.is_empty() {
        format!("Tagged: {} ({})", filter.tags.join(", "), n)
    } else if !query.is_empty() {
        format!("Search results for \"{}\" ({})", query, n)
    } else {
        format!("All Bookmarks ({})", n)
    };

    let empty = if !visible.is_empty() {
        None
    } else if bookmarks.is_empty() {
        Some(EmptyReason::NoBookmarks)
    } else {
        Some(EmptyReason::NoMatches)
    };

    BookmarkView {
        heading,
        bookmarks: visible,
        empty,
    }
}
