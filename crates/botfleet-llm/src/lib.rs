pub mod dispatcher;
pub mod openai;
pub mod provider;

pub use dispatcher::{ActionCooldownGate, DispatchOutcome, FunctionCallResult, FunctionDispatcher};
pub use openai::OpenAiCompatProvider;
pub use provider::{ChatRequest, ChatResponse, LlmProvider, Message, Role, ToolCall, ToolDefinition};
