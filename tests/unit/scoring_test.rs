//! Unit tests for the scoring pipeline: the scoring function, the client
//! flow, and how the manager applies finished attempts.
//!
//! The completion provider is replaced by a scripted client so no network
//! access is needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tagshelf::managers::bookmark_manager::BookmarkManager;
use tagshelf::services::completion::CompletionClient;
use tagshelf::services::notifier::RecordingNotifier;
use tagshelf::services::score_function::{ApiKeySource, ScoreFunction, ScoringOptions};
use tagshelf::services::scoring::{LocalScoringClient, ScoringClient, ScoringFlow};
use tagshelf::store::{MemoryStore, RecordStore};
use tagshelf::types::ai::{ChatRole, CompletionRequest};
use tagshelf::types::bookmark::{Bookmark, BookmarkDraft, Folder, FolderDraft};
use tagshelf::types::errors::{CompletionError, ScoringError, StoreError};
use tagshelf::types::notification::NotifyLevel;
use tagshelf::types::score::{ScoreResult, ScoreState};
use zeroize::Zeroizing;

/// Completion client that answers every request with the same scripted reply.
struct ScriptedCompletion {
    reply: Result<String, CompletionError>,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    fn content(content: &str) -> Arc<Self> {
        Arc::new(Self { reply: Ok(content.to_string()), calls: AtomicUsize::new(0) })
    }

    fn failing(err: CompletionError) -> Arc<Self> {
        Arc::new(Self { reply: Err(err), calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(
        &self,
        request: &CompletionRequest,
        api_key: &str,
    ) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(api_key, "sk-test");
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.max_tokens, 200);
        assert_eq!(request.messages[0].role, ChatRole::System);
        assert!(request.messages[1].content.contains("Title: Rust Book"));
        match &self.reply {
            Ok(content) => Ok(content.clone()),
            Err(CompletionError::Api(m)) => Err(CompletionError::Api(m.clone())),
            Err(CompletionError::Transport(m)) => Err(CompletionError::Transport(m.clone())),
            Err(CompletionError::Malformed(m)) => Err(CompletionError::Malformed(m.clone())),
        }
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_seed(
        vec![Bookmark {
            id: 1,
            title: "Rust Book".into(),
            url: "https://rust-lang.org".into(),
            description: Some("The Rust Programming Language".into()),
            folder_id: None,
            tags: vec!["rust".into(), "lang".into()],
            created_at: 10,
            updated_at: 10,
            score: None,
        }],
        Vec::new(),
    ))
}

fn key() -> ApiKeySource {
    ApiKeySource::Fixed(Zeroizing::new("sk-test".to_string()))
}

fn function(store: Arc<MemoryStore>, completion: Arc<ScriptedCompletion>, api_key: ApiKeySource) -> Arc<ScoreFunction> {
    Arc::new(ScoreFunction::new(store, completion, api_key, ScoringOptions::default()))
}

async fn stored_score(store: &MemoryStore) -> Option<f64> {
    store.get_bookmark(1).await.unwrap().score
}

#[tokio::test]
async fn test_valid_score_is_persisted_and_visible_after_reload() {
    let store = seeded_store();
    let completion = ScriptedCompletion::content(r#"{"score": 7.5, "reasoning": "Clear title and credible source"}"#);
    let flow = ScoringFlow::new(Arc::new(LocalScoringClient::new(function(
        store.clone(),
        completion.clone(),
        key(),
    ))));
    let notifier = Arc::new(RecordingNotifier::new());
    let mut mgr = BookmarkManager::new(store.clone(), notifier.clone());
    mgr.load_data().await.unwrap();

    let attempt = mgr.score_bookmark(&flow, 1).await;

    assert_eq!(
        attempt.state,
        ScoreState::Scored(ScoreResult {
            bookmark_id: 1,
            score: 7.5,
            reasoning: "Clear title and credible source".into(),
        })
    );
    assert_eq!(completion.calls(), 1);
    assert_eq!(stored_score(&store).await, Some(7.5));
    assert_eq!(mgr.bookmark(1).and_then(|b| b.score), Some(7.5));
    let n = notifier.notifications();
    assert_eq!(n[n.len() - 1].level, NotifyLevel::Success);
    assert_eq!(n[n.len() - 1].message, "Bookmark scored successfully");
}

#[tokio::test]
async fn test_out_of_range_score_fails_without_touching_store() {
    let store = seeded_store();
    let flow = ScoringFlow::new(Arc::new(LocalScoringClient::new(function(
        store.clone(),
        ScriptedCompletion::content(r#"{"score": 11, "reasoning": "excellent"}"#),
        key(),
    ))));
    let notifier = Arc::new(RecordingNotifier::new());
    let mut mgr = BookmarkManager::new(store.clone(), notifier.clone());
    mgr.load_data().await.unwrap();

    let attempt = mgr.score_bookmark(&flow, 1).await;

    assert_eq!(
        attempt.state,
        ScoreState::Failed { reason: "Invalid score received from OpenAI".into() }
    );
    assert_eq!(stored_score(&store).await, None);
    assert_eq!(mgr.bookmark(1).and_then(|b| b.score), None);
    assert_eq!(notifier.errors(), vec!["Invalid score received from OpenAI".to_string()]);
}

#[tokio::test]
async fn test_handle_missing_id_is_400() {
    let completion = ScriptedCompletion::content("{}");
    let f = function(seeded_store(), completion.clone(), key());

    let response = f.handle(&json!({})).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.body, json!({"success": false, "message": "Bookmark ID is required"}));
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_handle_unknown_bookmark_is_404() {
    let completion = ScriptedCompletion::content("{}");
    let f = function(seeded_store(), completion.clone(), key());

    let response = f.handle(&json!({"bookmarkId": 42})).await;
    assert_eq!(response.status, 404);
    assert_eq!(response.body["message"], "Bookmark not found");
    assert_eq!(completion.calls(), 0);
}

/// Store whose backend cannot be reached.
struct UnreachableStore;

fn unreachable() -> StoreError {
    StoreError::Transport("connection refused".into())
}

#[async_trait]
impl RecordStore for UnreachableStore {
    fn backend_name(&self) -> &'static str {
        "unreachable"
    }
    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>, StoreError> {
        Err(unreachable())
    }
    async fn get_bookmark(&self, _id: i64) -> Result<Bookmark, StoreError> {
        Err(unreachable())
    }
    async fn create_bookmark(&self, _draft: &BookmarkDraft) -> Result<Bookmark, StoreError> {
        Err(unreachable())
    }
    async fn update_bookmark(&self, _id: i64, _draft: &BookmarkDraft) -> Result<Bookmark, StoreError> {
        Err(unreachable())
    }
    async fn set_score(&self, _id: i64, _score: f64) -> Result<(), StoreError> {
        Err(unreachable())
    }
    async fn delete_bookmark(&self, _id: i64) -> Result<(), StoreError> {
        Err(unreachable())
    }
    async fn list_folders(&self) -> Result<Vec<Folder>, StoreError> {
        Err(unreachable())
    }
    async fn create_folder(&self, _draft: &FolderDraft) -> Result<Folder, StoreError> {
        Err(unreachable())
    }
    async fn update_folder(&self, _id: i64, _draft: &FolderDraft) -> Result<Folder, StoreError> {
        Err(unreachable())
    }
    async fn delete_folder(&self, _id: i64) -> Result<(), StoreError> {
        Err(unreachable())
    }
}

#[tokio::test]
async fn test_store_outage_during_lookup_is_500() {
    let completion = ScriptedCompletion::content("{}");
    let f = ScoreFunction::new(
        Arc::new(UnreachableStore),
        completion.clone(),
        key(),
        ScoringOptions::default(),
    );

    let err = f.score(1).await.unwrap_err();
    assert_eq!(err, ScoringError::Lookup("Record store unreachable: connection refused".into()));

    let response = f.handle(&json!({"bookmarkId": 1})).await;
    assert_eq!(response.status, 500);
    assert_eq!(
        response.body,
        json!({"success": false, "message": "Record store unreachable: connection refused"})
    );
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_handle_success_body() {
    let f = function(
        seeded_store(),
        ScriptedCompletion::content(r#"{"score": 9, "reasoning": "good"}"#),
        key(),
    );

    let response = f.handle(&json!({"bookmarkId": "1"})).await;
    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        json!({"success": true, "data": {"bookmarkId": 1, "score": 9.0, "reasoning": "good"}})
    );
}

#[tokio::test]
async fn test_missing_key_fails_before_calling_provider() {
    let store = seeded_store();
    let completion = ScriptedCompletion::content(r#"{"score": 5}"#);
    let f = function(store.clone(), completion.clone(), ApiKeySource::Missing);

    let response = f.handle(&json!({"bookmarkId": 1})).await;
    assert_eq!(response.status, 500);
    assert_eq!(response.body["message"], "OpenAI API key not configured");
    assert_eq!(completion.calls(), 0);
    assert_eq!(stored_score(&store).await, None);
}

#[tokio::test]
async fn test_provider_errors_map_to_messages() {
    let cases = vec![
        (
            CompletionError::Api("Rate limit reached".into()),
            ScoringError::Upstream("Rate limit reached".into()),
        ),
        (
            CompletionError::Malformed("no choices in response".into()),
            ScoringError::MalformedResponse,
        ),
        (
            CompletionError::Transport("timed out".into()),
            ScoringError::Transport("timed out".into()),
        ),
    ];

    for (provider_error, expected) in cases {
        let store = seeded_store();
        let f = function(store.clone(), ScriptedCompletion::failing(provider_error), key());
        assert_eq!(f.score(1).await, Err(expected));
        assert_eq!(stored_score(&store).await, None);
    }
}

#[tokio::test]
async fn test_non_json_completion_is_parse_failure() {
    let store = seeded_store();
    let f = function(store.clone(), ScriptedCompletion::content("I'd give it a 7."), key());
    assert_eq!(f.score(1).await, Err(ScoringError::MalformedResponse));
    assert_eq!(stored_score(&store).await, None);
}

/// Client that reports a result for a different bookmark than asked.
struct MismatchedClient;

#[async_trait]
impl ScoringClient for MismatchedClient {
    async fn request_score(&self, _bookmark_id: i64) -> Result<ScoreResult, ScoringError> {
        Ok(ScoreResult { bookmark_id: 99, score: 5.0, reasoning: String::new() })
    }
}

#[tokio::test]
async fn test_flow_rejects_result_for_other_bookmark() {
    let attempt = ScoringFlow::new(Arc::new(MismatchedClient)).run(1).await;
    assert!(attempt.state.is_terminal());
    assert!(matches!(attempt.state, ScoreState::Failed { .. }));
}

#[tokio::test]
async fn test_repeated_runs_are_distinct_attempts() {
    let store = seeded_store();
    let flow = ScoringFlow::new(Arc::new(LocalScoringClient::new(function(
        store.clone(),
        ScriptedCompletion::content(r#"{"score": 6, "reasoning": "ok"}"#),
        key(),
    ))));

    let first = flow.run(1).await;
    let second = flow.run(1).await;
    assert_ne!(first.attempt_id, second.attempt_id);
    assert!(matches!(second.state, ScoreState::Scored(_)));
    assert_eq!(stored_score(&store).await, Some(6.0));
}
