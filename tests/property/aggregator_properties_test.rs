//! Property-based tests for the collection aggregator.
//!
//! These tests check the filter laws (identity, subset, exact folder match,
//! any-of tag match, order independence) and facet/count totals over
//! arbitrary libraries.

use proptest::prelude::*;
use tagshelf::services::aggregator::{bookmark_counts, filter_bookmarks, tag_facets};
use tagshelf::types::bookmark::{Bookmark, FilterState, Folder, FolderColor};

/// Small tag alphabet so filters and facets actually collide.
fn arb_tag() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("rust".to_string()),
        Just("go".to_string()),
        Just("web".to_string()),
        Just("docs".to_string()),
        Just("ai".to_string()),
    ]
}

/// Strategy for a library of bookmarks with unique ids.
fn arb_library() -> impl Strategy<Value = Vec<Bookmark>> {
    proptest::collection::vec(
        (
            "[a-zA-Z ]{1,20}",
            "[a-z]{2,10}",
            proptest::option::of("[a-z ]{0,20}"),
            proptest::option::of(1i64..4),
            proptest::collection::vec(arb_tag(), 0..4),
            0i64..50,
        ),
        0..25,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (title, host, description, folder_id, mut tags, created_at))| {
                tags.sort();
                tags.dedup();
                Bookmark {
                    id: i as i64 + 1,
                    title,
                    url: format!("https://{}.com", host),
                    description,
                    folder_id,
                    tags,
                    created_at,
                    updated_at: created_at,
                    score: None,
                }
            })
            .collect()
    })
}

fn folders() -> Vec<Folder> {
    (1..4)
        .map(|id| Folder {
            id,
            name: format!("Folder {}", id),
            color: FolderColor::Green,
            created_at: 0,
        })
        .collect()
}

fn ids(found: &[&Bookmark]) -> Vec<i64> {
    found.iter().map(|b| b.id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// No filters returns every bookmark, newest first.
    #[test]
    fn empty_filter_returns_everything_ordered(library in arb_library()) {
        let found = filter_bookmarks(&library, &FilterState::default());
        prop_assert_eq!(found.len(), library.len());
        for pair in found.windows(2) {
            prop_assert!(
                (pair[0].created_at, pair[0].id) > (pair[1].created_at, pair[1].id),
                "out of order: {:?} before {:?}", pair[0].id, pair[1].id
            );
        }
    }

    /// Text filtering only ever narrows, and every hit contains the query somewhere.
    #[test]
    fn text_filter_is_a_matching_subset(library in arb_library(), q in "[a-z]{1,3}") {
        let found = filter_bookmarks(&library, &FilterState { query: q.clone(), ..FilterState::default() });
        prop_assert!(found.len() <= library.len());
        for b in found {
            let hay = format!(
                "{} {} {} {}",
                b.title.to_lowercase(),
                b.url.to_lowercase(),
                b.description.clone().unwrap_or_default().to_lowercase(),
                b.tags.join(" ").to_lowercase()
            );
            prop_assert!(hay.contains(&q));
        }
    }

    /// A folder filter returns exactly the bookmarks in that folder.
    #[test]
    fn folder_filter_is_exact(library in arb_library(), folder_id in 1i64..4) {
        let found = filter_bookmarks(&library, &FilterState { folder_id: Some(folder_id), ..FilterState::default() });
        let expected = library.iter().filter(|b| b.folder_id == Some(folder_id)).count();
        prop_assert_eq!(found.len(), expected);
        prop_assert!(found.iter().all(|b| b.folder_id == Some(folder_id)));
    }

    /// A tag filter returns exactly the bookmarks carrying at least one active tag.
    #[test]
    fn tag_filter_is_any_of(library in arb_library(), active in proptest::collection::vec(arb_tag(), 1..3)) {
        let found = filter_bookmarks(&library, &FilterState { tags: active.clone(), ..FilterState::default() });
        let expected = library
            .iter()
            .filter(|b| b.tags.iter().any(|t| active.contains(t)))
            .count();
        prop_assert_eq!(found.len(), expected);
    }

    /// Input order never changes the output.
    #[test]
    fn filter_ignores_input_order(library in arb_library(), q in "[a-z]{0,2}") {
        let filter = FilterState { query: q, ..FilterState::default() };
        let mut reversed = library.clone();
        reversed.reverse();
        prop_assert_eq!(
            ids(&filter_bookmarks(&library, &filter)),
            ids(&filter_bookmarks(&reversed, &filter))
        );
    }

    /// Facet counts add up to the number of tag occurrences and are non-increasing.
    #[test]
    fn facet_counts_sum_to_tag_occurrences(library in arb_library()) {
        let facets = tag_facets(&library);
        let occurrences: usize = library.iter().map(|b| b.tags.len()).sum();
        prop_assert_eq!(facets.iter().map(|f| f.count).sum::<usize>(), occurrences);
        for pair in facets.windows(2) {
            prop_assert!(pair[0].count >= pair[1].count);
        }
        prop_assert_eq!(tag_facets(&library), facets);
    }

    /// Every folder is reported, and per-folder counts never exceed the total.
    #[test]
    fn counts_cover_every_folder(library in arb_library()) {
        let counts = bookmark_counts(&library, &folders());
        prop_assert_eq!(counts.total, library.len());
        prop_assert_eq!(counts.folders.len(), 3);
        let filed = library.iter().filter(|b| b.folder_id.is_some()).count();
        prop_assert_eq!(counts.folders.values().sum::<usize>(), filed);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Combining filters gives the intersection of applying each one alone.
    #[test]
    fn combined_filters_equal_intersection(
        library in arb_library(),
        q in "[a-z]{0,2}",
        folder_id in proptest::option::of(1i64..4),
        active in proptest::collection::vec(arb_tag(), 0..2),
    ) {
        let combined = ids(&filter_bookmarks(&library, &FilterState {
            query: q.clone(),
            folder_id,
            tags: active.clone(),
        }));

        let by_text = ids(&filter_bookmarks(&library, &FilterState { query: q, ..FilterState::default() }));
        let by_folder = ids(&filter_bookmarks(&library, &FilterState { folder_id, ..FilterState::default() }));
        let by_tag = ids(&filter_bookmarks(&library, &FilterState { tags: active, ..FilterState::default() }));
        let intersection: Vec<i64> = by_text
            .into_iter()
            .filter(|id| by_folder.contains(id) && by_tag.contains(id))
            .collect();

        prop_assert_eq!(combined, intersection);
    }
}
