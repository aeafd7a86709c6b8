//! RPC method handler for the tagshelf JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` dispatches JSON-RPC method calls to the bookmark manager,
//! the scoring flow and the settings engine held by `App`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::app::App;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::bookmark::{BookmarkDraft, FilterState, FolderDraft};

fn to_json<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("serialization error: {}", e))
}

fn from_params<T: DeserializeOwned>(params: &Value) -> Result<T, String> {
    serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {}", e))
}

/// Reads a record id that may arrive as a number or a numeric string.
fn param_id(params: &Value, key: &str) -> Result<i64, String> {
    let id = match params.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => return Err(format!("missing {}", key)),
    };
    id.ok_or_else(|| format!("invalid {}", key))
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
/// The App lock is never held while a scoring request is in flight.
pub async fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Library ───
        "data.reload" => {
            let mut a = app.lock().await;
            a.bookmarks.load_data().await.map_err(|e| e.to_string())?;
            Ok(json!({
                "bookmarks": a.bookmarks.bookmarks().len(),
                "folders": a.bookmarks.folders().len(),
            }))
        }

        // ─── Bookmarks ───
        "bookmark.list" => {
            let a = app.lock().await;
            to_json(&a.bookmarks.bookmarks())
        }
        "bookmark.get" => {
            let id = param_id(params, "id")?;
            let a = app.lock().await;
            let bookmark = a
                .bookmarks
                .bookmark(id)
                .ok_or_else(|| format!("bookmark not found: {}", id))?;
            to_json(bookmark)
        }
        "bookmark.add" => {
            let draft: BookmarkDraft = from_params(params)?;
            let mut a = app.lock().await;
            let bookmark = a.bookmarks.add_bookmark(&draft).await.map_err(|e| e.to_string())?;
            to_json(&bookmark)
        }
        "bookmark.update" => {
            let id = param_id(params, "id")?;
            let draft: BookmarkDraft = from_params(params)?;
            let mut a = app.lock().await;
            let bookmark = a
                .bookmarks
                .update_bookmark(id, &draft)
                .await
                .map_err(|e| e.to_string())?;
            to_json(&bookmark)
        }
        "bookmark.delete" => {
            let id = param_id(params, "id")?;
            let mut a = app.lock().await;
            a.bookmarks.delete_bookmark(id).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "bookmark.import" => {
            let raw = params.get("bookmarks").ok_or("missing bookmarks")?;
            let drafts: Vec<BookmarkDraft> = from_params(raw)?;
            let mut a = app.lock().await;
            let outcome = a
                .bookmarks
                .import_bookmarks(&drafts)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({
                "imported": to_json(&outcome.applied)?,
                "failures": to_json(&outcome.failures)?,
            }))
        }
        "bookmark.search" => {
            let query = params.get("query").and_then(|v| v.as_str()).ok_or("missing query")?;
            let a = app.lock().await;
            to_json(&a.bookmarks.search_bookmarks(query))
        }
        "bookmark.view" => {
            let filter: FilterState = from_params(params)?;
            let a = app.lock().await;
            to_json(&a.bookmarks.view(&filter))
        }
        "bookmark.score" => {
            let id = param_id(params, "id")?;
            let flow = app.lock().await.scoring.clone();
            let attempt = flow.run(id).await;
            app.lock().await.bookmarks.apply_score_attempt(&attempt).await;
            to_json(&attempt)
        }

        // ─── Folders ───
        "folder.list" => {
            let a = app.lock().await;
            to_json(&a.bookmarks.folders())
        }
        "folder.add" => {
            let draft: FolderDraft = from_params(params)?;
            let mut a = app.lock().await;
            let folder = a.bookmarks.add_folder(&draft).await.map_err(|e| e.to_string())?;
            to_json(&folder)
        }
        "folder.update" => {
            let id = param_id(params, "id")?;
            let draft: FolderDraft = from_params(params)?;
            let mut a = app.lock().await;
            let folder = a
                .bookmarks
                .update_folder(id, &draft)
                .await
                .map_err(|e| e.to_string())?;
            to_json(&folder)
        }
        "folder.delete" => {
            let id = param_id(params, "id")?;
            let mut a = app.lock().await;
            a.bookmarks.delete_folder(id).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Facets ───
        "tags.list" => {
            let a = app.lock().await;
            to_json(&a.bookmarks.tags())
        }
        "counts.get" => {
            let a = app.lock().await;
            to_json(&a.bookmarks.counts())
        }

        // ─── Scoring function ───
        "scoring.invoke" => {
            let function = app
                .lock()
                .await
                .score_function
                .clone()
                .ok_or("scoring function runs remotely")?;
            let response = function.handle(params).await;
            Ok(json!({"status": response.status, "body": response.body}))
        }

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().await;
            to_json(a.settings_engine.get_settings())
        }
        "settings.set" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().await;
            a.settings_engine.set_value(key, value).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "settings.reset" => {
            let mut a = app.lock().await;
            a.settings_engine.reset().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
