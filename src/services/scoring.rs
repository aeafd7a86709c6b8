//! Client side of bookmark scoring.
//!
//! A [`ScoringFlow`] run makes exactly one call to a [`ScoringClient`] and
//! ends in either `Scored` or `Failed`. There is no retry; running the flow
//! again for the same bookmark simply scores it again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::services::score_function::ScoreFunction;
use crate::types::errors::ScoringError;
use crate::types::score::{is_valid_score, ScoreAttempt, ScoreResult, ScoreState};

/// Asks a scoring function to grade one bookmark.
#[async_trait]
pub trait ScoringClient: Send + Sync {
    async fn request_score(&self, bookmark_id: i64) -> Result<ScoreResult, ScoringError>;
}

/// Runs the scoring function in the same process.
pub struct LocalScoringClient {
    function: Arc<ScoreFunction>,
}

impl LocalScoringClient {
    pub fn new(function: Arc<ScoreFunction>) -> Self {
        Self { function }
    }
}

#[async_trait]
impl ScoringClient for LocalScoringClient {
    async fn request_score(&self, bookmark_id: i64) -> Result<ScoreResult, ScoringError> {
        self.function.score(bookmark_id).await
    }
}

#[derive(Debug, Deserialize)]
struct FunctionEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScoreResult>,
    #[serde(default)]
    message: Option<String>,
}

/// Maps a scoring-function HTTP answer to a result.
///
/// Anything other than a 2xx with `success: true` and an in-range score is a
/// failure carrying the function's message, or a generic one if it sent none.
pub fn interpret_function_response(status: u16, body: &str) -> Result<ScoreResult, ScoringError> {
    let envelope: Option<FunctionEnvelope> = serde_json::from_str(body).ok();
    let is_success = (200..300).contains(&status);

    match envelope {
        Some(FunctionEnvelope {
            success: true,
            data: Some(result),
            ..
        }) if is_success => {
            if is_valid_score(result.score) {
                Ok(result)
            } else {
                Err(ScoringError::InvalidScore)
            }
        }
        Some(env) if !is_success || !env.success => Err(ScoringError::Remote {
            status,
            message: env
                .message
                .unwrap_or_else(|| "Failed to score bookmark".to_string()),
        }),
        None if !is_success => Err(ScoringError::Remote {
            status,
            message: format!("Scoring function returned HTTP {}", status),
        }),
        _ => Err(ScoringError::MalformedResponse),
    }
}

/// Calls a deployed scoring function over HTTP.
pub struct HttpScoringClient {
    client: Client,
    function_url: String,
}

impl HttpScoringClient {
    pub fn new(function_url: &str, timeout: Duration) -> Result<Self, ScoringError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScoringError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            function_url: function_url.to_string(),
        })
    }
}

#[async_trait]
impl ScoringClient for HttpScoringClient {
    async fn request_score(&self, bookmark_id: i64) -> Result<ScoreResult, ScoringError> {
        let response = self
            .client
            .post(&self.function_url)
            .json(&json!({ "bookmarkId": bookmark_id }))
            .send()
            .await
            .map_err(|e| ScoringError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ScoringError::Transport(e.to_string()))?;
        interpret_function_response(status, &body)
    }
}

/// Drives single scoring attempts: `idle → requesting → {scored, failed}`.
#[derive(Clone)]
pub struct ScoringFlow {
    client: Arc<dyn ScoringClient>,
}

impl ScoringFlow {
    pub fn new(client: Arc<dyn ScoringClient>) -> Self {
        Self { client }
    }

    /// Runs one attempt to completion and returns it in a terminal state.
    pub async fn run(&self, bookmark_id: i64) -> ScoreAttempt {
        let mut attempt = ScoreAttempt::new(bookmark_id);
        attempt.state = ScoreState::Requesting;
        info!(attempt = %attempt.attempt_id, bookmark_id, "scoring requested");

        attempt.state = match self.client.request_score(bookmark_id).await {
            Ok(result) if result.bookmark_id == bookmark_id => ScoreState::Scored(result),
            Ok(result) => ScoreState::Failed {
                reason: format!(
                    "Scoring returned a result for bookmark {} instead of {}",
                    result.bookmark_id, bookmark_id
                ),
            },
            Err(err) => ScoreState::Failed {
                reason: err.to_string(),
            },
        };

        if let ScoreState::Failed { reason } = &attempt.state {
            warn!(attempt = %attempt.attempt_id, bookmark_id, %reason, "scoring failed");
        }
        attempt
    }
}
