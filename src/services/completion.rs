//! Text-completion provider client.
//!
//! [`CompletionClient`] is the seam between the scoring function and the
//! third-party model; [`OpenAiClient`] is the HTTP implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::types::ai::{CompletionRequest, CompletionResponse, ProviderErrorBody};
use crate::types::errors::CompletionError;

/// Sends one chat-completion request and returns the first choice's text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
        api_key: &str,
    ) -> Result<String, CompletionError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

/// Pulls the upstream error message out of a failed response body.
pub fn provider_error_message(body: &str) -> String {
    serde_json::from_str::<ProviderErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| "Unknown error".to_string())
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        api_key: &str,
    ) -> Result<String, CompletionError> {
        debug!(model = %request.model, endpoint = %self.endpoint, "completion request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(CompletionError::Api(provider_error_message(&body)));
        }

        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| CompletionError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::Malformed("no choices in response".to_string()))
    }
}
