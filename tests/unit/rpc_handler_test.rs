//! Unit tests for the RPC handler: the JSON-RPC methods dispatched by `handle_method`.
//!
//! These tests go through the same code path as the `tagshelf-rpc` binary,
//! using an in-memory record store and a scripted completion provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

use tagshelf::app::App;
use tagshelf::rpc_handler::handle_method;
use tagshelf::services::completion::CompletionClient;
use tagshelf::services::notifier::RecordingNotifier;
use tagshelf::services::score_function::ApiKeySource;
use tagshelf::types::ai::CompletionRequest;
use tagshelf::types::errors::CompletionError;
use zeroize::Zeroizing;

struct FixedCompletion(&'static str);

#[async_trait]
impl CompletionClient for FixedCompletion {
    async fn complete(&self, _: &CompletionRequest, _: &str) -> Result<String, CompletionError> {
        Ok(self.0.to_string())
    }
}

/// Create a fresh App whose settings file lives in a temp directory.
fn setup_with(reply: &'static str) -> (Mutex<App>, Arc<RecordingNotifier>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let settings_path = tmp.path().join("settings.json");
    let notifier = Arc::new(RecordingNotifier::new());
    let app = App::in_memory(
        settings_path.to_str().unwrap(),
        Arc::new(FixedCompletion(reply)),
        ApiKeySource::Fixed(Zeroizing::new("sk-test".into())),
        notifier.clone(),
    )
    .expect("Failed to init App");
    (Mutex::new(app), notifier, tmp)
}

fn setup() -> (Mutex<App>, Arc<RecordingNotifier>, TempDir) {
    setup_with(r#"{"score": 8, "reasoning": "solid"}"#)
}

async fn call(app: &Mutex<App>, method: &str, params: Value) -> Value {
    handle_method(app, method, &params)
        .await
        .unwrap_or_else(|e| panic!("{} failed: {}", method, e))
}

// ─── Ping ───

#[tokio::test]
async fn test_ping() {
    let (app, _, _tmp) = setup();
    assert_eq!(call(&app, "ping", json!({})).await, json!({"pong": true}));
}

// ─── Unknown method ───

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (app, _, _tmp) = setup();
    let res = handle_method(&app, "nonexistent.method", &json!({})).await;
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Bookmarks ───

#[tokio::test]
async fn test_bookmark_add_list_get() {
    let (app, notifier, _tmp) = setup();

    let added = call(
        &app,
        "bookmark.add",
        json!({"title": "Rust", "url": "https://rust-lang.org", "tags": ["rust"]}),
    )
    .await;
    let id = added["id"].as_i64().unwrap();
    assert_eq!(added["title"], "Rust");
    assert_eq!(notifier.notifications()[0].message, "Bookmark added successfully!");

    let list = call(&app, "bookmark.list", json!({})).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let got = call(&app, "bookmark.get", json!({"id": id.to_string()})).await;
    assert_eq!(got["url"], "https://rust-lang.org");
}

#[tokio::test]
async fn test_bookmark_add_validation_error() {
    let (app, _, _tmp) = setup();
    let err = handle_method(&app, "bookmark.add", &json!({"title": "", "url": "nope"}))
        .await
        .unwrap_err();
    assert_eq!(err, "Title is required; Please enter a valid URL");
}

#[tokio::test]
async fn test_bookmark_add_missing_fields() {
    let (app, _, _tmp) = setup();
    let err = handle_method(&app, "bookmark.add", &json!({"title": "x"}))
        .await
        .unwrap_err();
    assert!(err.starts_with("invalid params"));
}

#[tokio::test]
async fn test_bookmark_update_and_delete() {
    let (app, _, _tmp) = setup();
    let added = call(&app, "bookmark.add", json!({"title": "Old", "url": "https://old.dev"})).await;
    let id = added["id"].clone();

    let updated = call(
        &app,
        "bookmark.update",
        json!({"id": id, "title": "New", "url": "https://new.dev"}),
    )
    .await;
    assert_eq!(updated["title"], "New");

    assert_eq!(call(&app, "bookmark.delete", json!({"id": id})).await, json!({"ok": true}));
    let err = handle_method(&app, "bookmark.delete", &json!({"id": id})).await.unwrap_err();
    assert!(err.contains("Bookmark not found"));
    assert!(handle_method(&app, "bookmark.delete", &json!({})).await.unwrap_err().contains("missing id"));
}

#[tokio::test]
async fn test_bookmark_import_partial() {
    let (app, _, _tmp) = setup();
    let res = call(
        &app,
        "bookmark.import",
        json!({"bookmarks": [
            {"title": "A", "url": "https://a.dev"},
            {"title": "B", "url": ""},
        ]}),
    )
    .await;
    assert_eq!(res["imported"].as_array().unwrap().len(), 1);
    assert_eq!(res["failures"], json!([{"index": 1, "message": "URL is required"}]));
}

#[tokio::test]
async fn test_search_view_tags_counts() {
    let (app, _, _tmp) = setup();
    let folder = call(&app, "folder.add", json!({"name": "Langs", "color": "green"})).await;
    assert_eq!(folder["color"], "green");
    call(
        &app,
        "bookmark.add",
        json!({"title": "Go Docs", "url": "https://go.dev", "folder_id": folder["id"], "tags": ["go"]}),
    )
    .await;
    call(
        &app,
        "bookmark.add",
        json!({"title": "Rust Book", "url": "https://rust-lang.org", "tags": ["rust", "lang"]}),
    )
    .await;

    let found = call(&app, "bookmark.search", json!({"query": "go"})).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["title"], "Go Docs");

    let view = call(&app, "bookmark.view", json!({"folder_id": folder["id"]})).await;
    assert_eq!(view["heading"], "Langs (1)");
    assert_eq!(view["empty"], Value::Null);

    let empty = call(&app, "bookmark.view", json!({"query": "zzz"})).await;
    assert_eq!(empty["empty"], "no_matches");

    let tags = call(&app, "tags.list", json!({})).await;
    assert_eq!(tags.as_array().unwrap().len(), 3);

    let counts = call(&app, "counts.get", json!({})).await;
    assert_eq!(counts["total"], 2);
    let folder_key = folder["id"].to_string();
    assert_eq!(counts["folders"][folder_key.as_str()], 1);
}

// ─── Folders ───

#[tokio::test]
async fn test_folder_update_delete() {
    let (app, _, _tmp) = setup();
    let folder = call(&app, "folder.add", json!({"name": "Tmp"})).await;
    assert_eq!(folder["color"], "blue");

    let renamed = call(&app, "folder.update", json!({"id": folder["id"], "name": "Kept", "color": "red"})).await;
    assert_eq!(renamed["name"], "Kept");

    call(&app, "folder.delete", json!({"id": folder["id"]})).await;
    assert_eq!(call(&app, "folder.list", json!({})).await, json!([]));

    let err = handle_method(&app, "folder.add", &json!({"name": "  "})).await.unwrap_err();
    assert_eq!(err, "Folder name is required");
}

// ─── Scoring ───

#[tokio::test]
async fn test_bookmark_score_updates_bookmark() {
    let (app, notifier, _tmp) = setup();
    let added = call(&app, "bookmark.add", json!({"title": "Rust", "url": "https://rust-lang.org"})).await;

    let attempt = call(&app, "bookmark.score", json!({"id": added["id"]})).await;
    assert_eq!(attempt["state"]["state"], "scored");
    assert_eq!(attempt["state"]["score"], 8.0);

    let got = call(&app, "bookmark.get", json!({"id": added["id"]})).await;
    assert_eq!(got["score"], 8.0);
    assert!(notifier
        .notifications()
        .iter()
        .any(|n| n.message == "Bookmark scored successfully"));
}

#[tokio::test]
async fn test_bookmark_score_invalid_reply_fails() {
    let (app, _, _tmp) = setup_with(r#"{"score": 0}"#);
    let added = call(&app, "bookmark.add", json!({"title": "Rust", "url": "https://rust-lang.org"})).await;

    let attempt = call(&app, "bookmark.score", json!({"id": added["id"]})).await;
    assert_eq!(attempt["state"]["state"], "failed");
    assert_eq!(attempt["state"]["reason"], "Invalid score received from OpenAI");

    let got = call(&app, "bookmark.get", json!({"id": added["id"]})).await;
    assert_eq!(got["score"], Value::Null);
}

#[tokio::test]
async fn test_scoring_invoke_returns_status_and_body() {
    let (app, _, _tmp) = setup();
    let res = call(&app, "scoring.invoke", json!({})).await;
    assert_eq!(res["status"], 400);
    assert_eq!(res["body"]["message"], "Bookmark ID is required");
}

// ─── Settings ───

#[tokio::test]
async fn test_settings_get_set_reset() {
    let (app, _, _tmp) = setup();
    let settings = call(&app, "settings.get", json!({})).await;
    assert_eq!(settings["storage"]["backend"], "memory");

    call(&app, "settings.set", json!({"key": "scoring.model", "value": "gpt-4o"})).await;
    let settings = call(&app, "settings.get", json!({})).await;
    assert_eq!(settings["scoring"]["model"], "gpt-4o");

    let err = handle_method(&app, "settings.set", &json!({"key": "scoring.nope", "value": 1}))
        .await
        .unwrap_err();
    assert!(err.starts_with("Invalid settings key"));

    call(&app, "settings.reset", json!({})).await;
    let settings = call(&app, "settings.get", json!({})).await;
    assert_eq!(settings["scoring"]["model"], "gpt-4o-mini");
}

// ─── Reload ───

#[tokio::test]
async fn test_data_reload_counts() {
    let (app, _, _tmp) = setup();
    call(&app, "folder.add", json!({"name": "F"})).await;
    call(&app, "bookmark.add", json!({"title": "T", "url": "https://t.dev"})).await;
    assert_eq!(
        call(&app, "data.reload", json!({})).await,
        json!({"bookmarks": 1, "folders": 1})
    );
}
