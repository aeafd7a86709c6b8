//! Bookmark scoring function.
//!
//! Server side of the scoring flow: takes `{"bookmarkId": ..}`, loads the
//! bookmark, asks the completion provider for a 1-10 grade, and writes the
//! score back to the record store. The store is only written after the grade
//! has been parsed and range-checked.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::services::completion::CompletionClient;
use crate::store::RecordStore;
use crate::types::ai::{ChatMessage, ChatRole, CompletionRequest};
use crate::types::bookmark::Bookmark;
use crate::types::errors::{CompletionError, ScoringError, StoreError};
use crate::types::score::{is_valid_score, ScoreResult};
use crate::types::settings::ScoringSettings;

const SYSTEM_PROMPT: &str = "You are a bookmark quality analyzer. Provide concise, objective scores based on the given criteria.";

/// HTTP-shaped answer of the scoring function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResponse {
    pub status: u16,
    pub body: Value,
}

impl FunctionResponse {
    fn ok(result: &ScoreResult) -> Self {
        Self {
            status: 200,
            body: json!({ "success": true, "data": result }),
        }
    }

    fn error(err: &ScoringError) -> Self {
        Self {
            status: err.status_code(),
            body: json!({ "success": false, "message": err.to_string() }),
        }
    }
}

/// Where the completion API key comes from.
#[derive(Clone)]
pub enum ApiKeySource {
    /// Read from the named environment variable on every request.
    Env(String),
    /// A key supplied directly.
    Fixed(Zeroizing<String>),
    /// No key is available.
    Missing,
}

impl ApiKeySource {
    pub fn resolve(&self) -> Option<Zeroizing<String>> {
        match self {
            ApiKeySource::Env(name) => std::env::var(name)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(Zeroizing::new),
            ApiKeySource::Fixed(key) => Some(key.clone()),
            ApiKeySource::Missing => None,
        }
    }
}

/// Model parameters for the grading request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self::from(&ScoringSettings::default())
    }
}

impl From<&ScoringSettings> for ScoringOptions {
    fn from(settings: &ScoringSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// Extracts a usable bookmark id from the request body.
///
/// Accepts a positive integer or a numeric string; anything else, including
/// `0`, counts as missing.
pub fn parse_bookmark_id(body: &Value) -> Result<i64, ScoringError> {
    let id = match body.get("bookmarkId") {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0).ok_or(ScoringError::MissingBookmarkId)
}

/// Renders the grading prompt for one bookmark.
pub fn build_prompt(bookmark: &Bookmark) -> String {
    fn or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
        if value.trim().is_empty() {
            fallback
        } else {
            value
        }
    }

    let tags = bookmark.tags.join(",");
    format!(
        "Analyze this bookmark and provide a quality score from 1-10 based on the following criteria:

Title: {title}
URL: {url}
Description: {description}
Tags: {tags}

Scoring Criteria:
- Title clarity and descriptiveness (1-3 points)
- Description quality and informativeness (1-3 points)
- URL credibility and relevance (1-2 points)
- Tags relevance and categorization (1-2 points)

Provide your response in the following JSON format:
{{
  \"score\": <number between 1-10>,
  \"reasoning\": \"<brief explanation of the score>\"
}}",
        title = or(&bookmark.title, "No title"),
        url = or(&bookmark.url, "No URL"),
        description = or(bookmark.description.as_deref().unwrap_or(""), "No description"),
        tags = or(&tags, "No tags"),
    )
}

/// Builds the chat-completion body for `prompt`.
pub fn build_request(options: &ScoringOptions, prompt: String) -> CompletionRequest {
    CompletionRequest {
        model: options.model.clone(),
        messages: vec![
            ChatMessage {
                role: ChatRole::System,
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: ChatRole::User,
                content: prompt,
            },
        ],
        temperature: options.temperature,
        max_tokens: options.max_tokens,
    }
}

/// Parses the model's `{score, reasoning}` answer and range-checks the score.
pub fn parse_score_content(content: &str) -> Result<(f64, String), ScoringError> {
    let parsed: Value =
        serde_json::from_str(content.trim()).map_err(|_| ScoringError::MalformedResponse)?;
    let object = parsed.as_object().ok_or(ScoringError::MalformedResponse)?;

    let score = match object.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| is_valid_score(*s))
    .ok_or(ScoringError::InvalidScore)?;

    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok((score, reasoning))
}

/// The scoring function: one store read, one completion call, one store write.
pub struct ScoreFunction {
    store: Arc<dyn RecordStore>,
    completion: Arc<dyn CompletionClient>,
    api_key: ApiKeySource,
    options: ScoringOptions,
}

impl ScoreFunction {
    pub fn new(
        store: Arc<dyn RecordStore>,
        completion: Arc<dyn CompletionClient>,
        api_key: ApiKeySource,
        options: ScoringOptions,
    ) -> Self {
        Self {
            store,
            completion,
            api_key,
            options,
        }
    }

    /// Handles a raw request body and answers with a status code and JSON body.
    pub async fn handle(&self, body: &Value) -> FunctionResponse {
        let result = match parse_bookmark_id(body) {
            Ok(id) => self.score(id).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(result) => FunctionResponse::ok(&result),
            Err(err) => {
                warn!(status = err.status_code(), error = %err, "scoring function failed");
                FunctionResponse::error(&err)
            }
        }
    }

    /// Grades `bookmark_id` and persists the score.
    pub async fn score(&self, bookmark_id: i64) -> Result<ScoreResult, ScoringError> {
        if bookmark_id <= 0 {
            return Err(ScoringError::MissingBookmarkId);
        }

        let bookmark = self
            .store
            .get_bookmark(bookmark_id)
            .await
            .map_err(|e| match e {
                StoreError::BookmarkNotFound(_) => ScoringError::BookmarkNotFound(bookmark_id),
                other => ScoringError::Lookup(other.to_string()),
            })?;

        let api_key = self.api_key.resolve().ok_or(ScoringError::MissingCredential)?;

        let request = build_request(&self.options, build_prompt(&bookmark));
        let content = self
            .completion
            .complete(&request, api_key.as_str())
            .await
            .map_err(|e| match e {
                CompletionError::Api(msg) => ScoringError::Upstream(msg),
                CompletionError::Transport(msg) => ScoringError::Transport(msg),
                CompletionError::Malformed(_) => ScoringError::MalformedResponse,
            })?;

        let (score, reasoning) = parse_score_content(&content)?;

        self.store
            .set_score(bookmark_id, score)
            .await
            .map_err(|e| match e {
                StoreError::Rejected(msg) => ScoringError::Persist(msg),
                StoreError::RecordFailures(_) => ScoringError::Persist(e.to_string()),
                _ => ScoringError::Persist("Failed to update bookmark score".to_string()),
            })?;

        info!(bookmark_id, score, "bookmark scored");
        Ok(ScoreResult {
            bookmark_id,
            score,
            reasoning,
        })
    }
}
