//! Translation between the hosted record API and internal types.
//!
//! The hosted store names custom fields with a `_c` suffix and system fields
//! in PascalCase (`Id`, `Name`, `CreatedOn`, `ModifiedOn`). Nothing outside
//! this module sees those names.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::BatchOutcome;
use crate::types::bookmark::{Bookmark, BookmarkDraft, Folder, FolderDraft};
use crate::types::errors::{RecordFailure, StoreError};

/// Fields requested when fetching bookmark records.
pub const BOOKMARK_FIELDS: &[&str] = &[
    "Id",
    "Name",
    "title_c",
    "url_c",
    "description_c",
    "folder_id_c",
    "tags_c",
    "score_c",
    "CreatedOn",
    "ModifiedOn",
];

/// Fields requested when fetching folder records.
pub const FOLDER_FIELDS: &[&str] = &["Id", "Name", "name_c", "color_c", "CreatedOn"];

// ─── Wire records ───

/// A lookup field arrives either as a bare id or as `{ "Id": .., "Name": .. }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LookupRef {
    Id(i64),
    Ref {
        #[serde(rename = "Id")]
        id: i64,
    },
}

/// Tag fields are stored comma-separated, though some endpoints return arrays.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagField {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct BookmarkRecord {
    #[serde(rename = "Id")]
    id: i64,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "title_c", default)]
    title: Option<String>,
    #[serde(rename = "url_c", default)]
    url: Option<String>,
    #[serde(rename = "description_c", default)]
    description: Option<String>,
    #[serde(rename = "folder_id_c", default)]
    folder: Option<LookupRef>,
    #[serde(rename = "tags_c", default)]
    tags: Option<TagField>,
    #[serde(rename = "score_c", default)]
    score: Option<f64>,
    #[serde(rename = "CreatedOn", default)]
    created_on: Option<String>,
    #[serde(rename = "ModifiedOn", default)]
    modified_on: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FolderRecord {
    #[serde(rename = "Id")]
    id: i64,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "name_c", default)]
    folder_name: Option<String>,
    #[serde(rename = "color_c", default)]
    color: Option<String>,
    #[serde(rename = "CreatedOn", default)]
    created_on: Option<String>,
}

// ─── Envelopes ───

#[derive(Debug, Deserialize)]
pub struct FieldIssue {
    #[serde(rename = "fieldLabel", default)]
    pub field_label: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordResult {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<FieldIssue>>,
}

/// The response shape every hosted-store call returns.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<RecordResult>>,
}

impl Envelope {
    fn rejected(&self) -> StoreError {
        StoreError::Rejected(
            self.message
                .clone()
                .unwrap_or_else(|| "request failed".to_string()),
        )
    }

    /// The `data` payload of a successful read.
    pub fn into_data(self) -> Result<Value, StoreError> {
        if !self.success {
            return Err(self.rejected());
        }
        match self.data {
            Some(Value::Null) | None => Err(StoreError::Malformed("response has no data".into())),
            Some(data) => Ok(data),
        }
    }

    /// Splits a write response into per-record successes and failures.
    ///
    /// `success: true` at the top level can still hide failed records; those
    /// come back as [`RecordFailure`]s alongside the records that were applied.
    /// Each applied record keeps its position in the submitted batch; a
    /// success that echoed no record carries `Value::Null`.
    pub fn into_outcome(self) -> Result<BatchOutcome<(usize, Value)>, StoreError> {
        if !self.success {
            return Err(self.rejected());
        }
        let mut outcome = BatchOutcome::default();
        for (index, result) in self.results.unwrap_or_default().into_iter().enumerate() {
            if result.success {
                outcome.applied.push((index, result.data.unwrap_or(Value::Null)));
            } else {
                outcome.failures.push(RecordFailure {
                    index,
                    message: failure_message(&result),
                });
            }
        }
        Ok(outcome)
    }

    /// Like [`Envelope::into_outcome`] for a single-record write: any failure is an error.
    pub fn into_single(self) -> Result<Option<Value>, StoreError> {
        let outcome = self.into_outcome()?;
        if !outcome.failures.is_empty() {
            return Err(StoreError::RecordFailures(outcome.failures));
        }
        Ok(outcome
            .applied
            .into_iter()
            .next()
            .map(|(_, data)| data)
            .filter(|data| !data.is_null()))
    }
}

/// Translates the applied records of a batch write.
///
/// A record that cannot be translated becomes a [`RecordFailure`] at its
/// batch position; the others are kept. Failures come back ordered by index.
pub fn translate_outcome<T>(
    raw: BatchOutcome<(usize, Value)>,
    translate: impl Fn(Value) -> Result<T, StoreError>,
) -> BatchOutcome<T> {
    let mut outcome = BatchOutcome {
        applied: Vec::with_capacity(raw.applied.len()),
        failures: raw.failures,
    };
    for (index, data) in raw.applied {
        if data.is_null() {
            outcome.failures.push(RecordFailure {
                index,
                message: "record saved but not returned".to_string(),
            });
            continue;
        }
        match translate(data) {
            Ok(record) => outcome.applied.push(record),
            Err(e) => outcome.failures.push(RecordFailure { index, message: e.to_string() }),
        }
    }
    outcome.failures.sort_by_key(|f| f.index);
    outcome
}

fn failure_message(result: &RecordResult) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(msg) = result.message.as_deref().filter(|m| !m.is_empty()) {
        parts.push(msg.to_string());
    }
    for issue in result.errors.iter().flatten() {
        match issue.field_label.as_deref() {
            Some(label) => parts.push(format!("{}: {}", label, issue.message)),
            None => parts.push(issue.message.clone()),
        }
    }
    if parts.is_empty() {
        "record rejected".to_string()
    } else {
        parts.join("; ")
    }
}

// ─── Inbound ───

/// Parses a hosted-store timestamp into UNIX seconds.
///
/// Accepts RFC 3339 and the offset-less `YYYY-MM-DDTHH:MM:SS[.fff]` form,
/// which is taken as UTC. A missing value maps to 0.
pub fn parse_timestamp(raw: Option<&str>) -> Result<i64, StoreError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(0);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().timestamp())
        .map_err(|e| StoreError::Malformed(format!("bad timestamp '{}': {}", raw, e)))
}

fn split_tags(field: Option<TagField>) -> Vec<String> {
    let raw: Vec<String> = match field {
        None => Vec::new(),
        Some(TagField::Text(s)) => s.split(',').map(str::to_string).collect(),
        Some(TagField::List(v)) => v,
    };
    crate::services::validation::normalize_tags(&raw)
}

/// Converts one hosted bookmark record into a [`Bookmark`].
pub fn bookmark_from_record(value: Value) -> Result<Bookmark, StoreError> {
    let record: BookmarkRecord =
        serde_json::from_value(value).map_err(|e| StoreError::Malformed(e.to_string()))?;

    let created_at = parse_timestamp(record.created_on.as_deref())?;
    let updated_at = match record.modified_on.as_deref() {
        Some(raw) => parse_timestamp(Some(raw))?,
        None => created_at,
    };

    Ok(Bookmark {
        id: record.id,
        title: record.title.or(record.name).unwrap_or_default(),
        url: record.url.unwrap_or_default(),
        description: record.description.filter(|d| !d.trim().is_empty()),
        folder_id: record.folder.map(|f| match f {
            LookupRef::Id(id) => id,
            LookupRef::Ref { id } => id,
        }),
        tags: split_tags(record.tags),
        created_at,
        updated_at,
        score: record.score,
    })
}

/// Converts one hosted folder record into a [`Folder`]. Unknown colors fall back to the default.
pub fn folder_from_record(value: Value) -> Result<Folder, StoreError> {
    let record: FolderRecord =
        serde_json::from_value(value).map_err(|e| StoreError::Malformed(e.to_string()))?;

    Ok(Folder {
        id: record.id,
        name: record.folder_name.or(record.name).unwrap_or_default(),
        color: record
            .color
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or_default(),
        created_at: parse_timestamp(record.created_on.as_deref())?,
    })
}

/// Converts a `data` array into records, failing on the first malformed entry.
pub fn records_from_list<T>(
    data: Value,
    convert: fn(Value) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    match data {
        Value::Array(items) => items.into_iter().map(convert).collect(),
        other => Err(StoreError::Malformed(format!("expected a list, got {}", other))),
    }
}

// ─── Outbound ───

/// Field map for creating or replacing a bookmark. `id` is included for updates.
pub fn bookmark_to_record(id: Option<i64>, draft: &BookmarkDraft) -> Value {
    let mut record = Map::new();
    if let Some(id) = id {
        record.insert("Id".into(), json!(id));
    }
    record.insert("Name".into(), json!(draft.title));
    record.insert("title_c".into(), json!(draft.title));
    record.insert("url_c".into(), json!(draft.url));
    record.insert(
        "description_c".into(),
        json!(draft.description.clone().unwrap_or_default()),
    );
    record.insert("folder_id_c".into(), json!(draft.folder_id));
    record.insert("tags_c".into(), json!(draft.tags.join(",")));
    Value::Object(record)
}

/// Field map for creating or replacing a folder.
pub fn folder_to_record(id: Option<i64>, draft: &FolderDraft) -> Value {
    let mut record = Map::new();
    if let Some(id) = id {
        record.insert("Id".into(), json!(id));
    }
    record.insert("Name".into(), json!(draft.name));
    record.insert("name_c".into(), json!(draft.name));
    record.insert(
        "color_c".into(),
        json!(draft.color.unwrap_or_default().as_str()),
    );
    Value::Object(record)
}

/// Field map that writes only the score.
pub fn score_to_record(id: i64, score: f64) -> Value {
    json!({ "Id": id, "score_c": score })
}
