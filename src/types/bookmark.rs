use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a saved bookmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub folder_id: Option<i64>,
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Quality score in `1.0..=10.0`, set by the scoring function.
    pub score: Option<f64>,
}

/// Represents a folder for organizing bookmarks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub color: FolderColor,
    pub created_at: i64,
}

/// The fixed palette a folder can be drawn with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FolderColor {
    #[default]
    Blue,
    Green,
    Purple,
    Red,
    Yellow,
    Gray,
}

impl FolderColor {
    pub const ALL: [FolderColor; 6] = [
        FolderColor::Blue,
        FolderColor::Green,
        FolderColor::Purple,
        FolderColor::Red,
        FolderColor::Yellow,
        FolderColor::Gray,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FolderColor::Blue => "blue",
            FolderColor::Green => "green",
            FolderColor::Purple => "purple",
            FolderColor::Red => "red",
            FolderColor::Yellow => "yellow",
            FolderColor::Gray => "gray",
        }
    }
}

impl fmt::Display for FolderColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FolderColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FolderColor::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown folder color: {}", s))
    }
}

/// Caller-supplied fields for creating or replacing a bookmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BookmarkDraft {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub folder_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Caller-supplied fields for creating or replacing a folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FolderDraft {
    pub name: String,
    #[serde(default)]
    pub color: Option<FolderColor>,
}

/// A tag together with the number of bookmarks currently carrying it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagFacet {
    pub name: String,
    pub count: usize,
}

/// Total bookmark count plus a per-folder breakdown.
///
/// Every known folder appears in `folders`, including those with no bookmarks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BookmarkCounts {
    pub total: usize,
    pub folders: BTreeMap<i64, usize>,
}

/// The filters currently applied to the bookmark list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FilterState {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub folder_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl FilterState {
    /// True when no filter of any kind is active.
    pub fn is_unfiltered(&self) -> bool {
        self.query.trim().is_empty() && self.folder_id.is_none() && self.tags.is_empty()
    }

    /// Focuses a single folder; tag and text filters are dropped.
    pub fn select_folder(&mut self, folder_id: i64) {
        self.folder_id = Some(folder_id);
        self.tags.clear();
        self.query.clear();
    }

    /// Adds the tag if absent, removes it otherwise. Folder and text filters are dropped.
    pub fn toggle_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
        } else {
            self.tags.push(tag.to_string());
        }
        self.folder_id = None;
        self.query.clear();
    }

    pub fn show_all(&mut self) {
        *self = FilterState::default();
    }
}

/// Why a view came back empty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The library holds no bookmarks at all.
    NoBookmarks,
    /// Bookmarks exist but none pass the active filters.
    NoMatches,
}

/// A filtered, ordered slice of the library ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct BookmarkView<'a> {
    pub heading: String,
    pub bookmarks: Vec<&'a Bookmark>,
    pub empty: Option<EmptyReason>,
}
