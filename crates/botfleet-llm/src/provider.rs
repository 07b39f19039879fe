use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single message in the conversation sent to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// Tool definition sent to the LLM as part of the `tools` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A single tool call requested by the model in its response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Request to an LLM provider, built directly from raw JSON conversation
/// history so the dispatcher can carry arbitrary role/tool_call_id shapes
/// without needing a richer typed model.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    /// Full message history as raw JSON objects (system, user, assistant,
    /// tool messages — whatever the session has accumulated).
    pub messages: Vec<serde_json::Value>,
    pub tools: Vec<ToolDefinition>,
}

/// Raw, unparsed response body plus the decision of whether the model asked
/// to call tools. The dispatcher works directly against the JSON value so it
/// can forward `message` verbatim into conversation history.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub raw: serde_json::Value,
    pub message: serde_json::Value,
    pub tool_calls: Vec<ToolCall>,
}

/// Common interface for LLM providers. Only one concrete implementation
/// ships (`OpenAiCompatProvider`) since every provider in the persisted
/// `llm_providers` table speaks the same OpenAI-compatible wire format.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}
