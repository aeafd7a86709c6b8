use serde::{Deserialize, Serialize};

/// Role of a participant in a chat-completion conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// A single message sent to or received from the completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Request body for an OpenAI-compatible `/chat/completions` call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The subset of a completion response that the scorer reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: ChatMessage,
}

/// Error body returned by the provider on a non-success status.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderErrorBody {
    #[serde(default)]
    pub error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}
