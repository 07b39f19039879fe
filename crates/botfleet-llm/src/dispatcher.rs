use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::provider::{ChatRequest, LlmProvider, ToolDefinition};

/// Bridges the dispatcher to session-scoped cooldown/activity bookkeeping
/// without pulling a hard dependency on the sessions crate (which itself
/// depends on this crate to call the LLM) — the session manager implements
/// this trait and is handed to the dispatcher as a trait object.
pub trait ActionCooldownGate: Send + Sync {
    fn check_cooldown(&self, session_id: &str, action: &str) -> bool;
    fn set_cooldown(&self, session_id: &str, action: &str);
    fn touch_activity(&self, session_id: &str);
}

type ToolFn = Arc<dyn Fn(&Value, &str) -> Value + Send + Sync>;

struct RegisteredFunction {
    definition: ToolDefinition,
    handler: ToolFn,
}

/// Result of a single function call, as carried back into conversation
/// history by a `role:"tool"` message.
#[derive(Debug, Clone)]
pub struct FunctionCallResult {
    pub tool_call_id: String,
    pub function_name: String,
    pub result: Value,
}

/// Outcome of `call_llm_with_functions`.
pub enum DispatchOutcome {
    /// The model asked to call one or more tools; they have already been
    /// executed and `message` (the assistant turn) plus `results` are ready
    /// to be appended to conversation history in that order.
    FunctionCallsExecuted {
        message: Value,
        results: Vec<FunctionCallResult>,
    },
    /// Plain assistant text, no tool calls.
    Message { content: String },
    /// The call failed outright (transport, parse, or API error).
    Error { message: String },
}

/// Routes named tool invocations to registered handlers and drives the
/// request/response cycle against an `LlmProvider`. Grounded on the
/// original `CFunctionDispatcher`: cooldown check before execution, results
/// serialized back as tool-role messages with string content.
pub struct FunctionDispatcher {
    functions: HashMap<String, RegisteredFunction>,
    cooldown_gate: Option<Arc<dyn ActionCooldownGate>>,
}

impl FunctionDispatcher {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            cooldown_gate: None,
        }
    }

    pub fn with_cooldown_gate(mut self, gate: Arc<dyn ActionCooldownGate>) -> Self {
        self.cooldown_gate = Some(gate);
        self
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: impl Fn(&Value, &str) -> Value + Send + Sync + 'static,
    ) {
        let name = name.into();
        self.functions.insert(
            name.clone(),
            RegisteredFunction {
                definition: ToolDefinition {
                    name,
                    description: description.into(),
                    parameters,
                },
                handler: Arc::new(handler),
            },
        );
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.functions.values().map(|f| f.definition.clone()).collect()
    }

    /// Execute a single named function. `session_id` being non-empty gates
    /// the call behind the per-action cooldown and touches session activity
    /// on success — an empty session id skips both (ad-hoc/no-session calls).
    pub fn execute_function(&self, name: &str, arguments: &Value, session_id: &str) -> Value {
        let Some(registered) = self.functions.get(name) else {
            return serde_json::json!({ "error": format!("Function not found: {name}") });
        };

        if !session_id.is_empty() {
            if let Some(gate) = &self.cooldown_gate {
                if !gate.check_cooldown(session_id, name) {
                    return serde_json::json!({ "error": format!("Action {name} is on cooldown") });
                }
            }
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            (registered.handler)(arguments, session_id)
        }));

        let value = match result {
            Ok(v) => v,
            Err(_) => {
                return serde_json::json!({ "error": format!("Function execution failed: {name}") })
            }
        };

        if !session_id.is_empty() {
            if let Some(gate) = &self.cooldown_gate {
                gate.set_cooldown(session_id, name);
                gate.touch_activity(session_id);
            }
        }

        value
    }

    /// Extracts `message.tool_calls`, executes each, and returns the
    /// per-call results in request order.
    pub fn handle_function_calls(
        &self,
        message: &Value,
        session_id: &str,
    ) -> Vec<FunctionCallResult> {
        let mut results = Vec::new();
        let Some(tool_calls) = message.get("tool_calls").and_then(|v| v.as_array()) else {
            return results;
        };

        for call in tool_calls {
            if call.get("type").and_then(|t| t.as_str()) != Some("function") {
                continue;
            }
            let Some(function) = call.get("function") else { continue };
            let name = function
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string();
            let tool_call_id = call
                .get("id")
                .and_then(|i| i.as_str())
                .unwrap_or_default()
                .to_string();
            let raw_args = function.get("arguments").and_then(|a| a.as_str()).unwrap_or("{}");
            let arguments: Value = serde_json::from_str(raw_args).unwrap_or(Value::Null);

            let result = self.execute_function(&name, &arguments, session_id);
            results.push(FunctionCallResult {
                tool_call_id,
                function_name: name,
                result,
            });
        }

        results
    }

    /// Builds the tool-role messages to append to conversation history.
    /// Content must be a JSON-encoded *string*, never a raw object.
    pub fn create_function_call_messages(&self, results: &[FunctionCallResult]) -> Vec<Value> {
        results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "role": "tool",
                    "tool_call_id": r.tool_call_id,
                    "content": r.result.to_string(),
                })
            })
            .collect()
    }

    /// Full round-trip: call the provider, then execute any requested tools.
    pub async fn call_llm_with_functions(
        &self,
        messages: Vec<Value>,
        model: &str,
        provider: &dyn LlmProvider,
        session_id: &str,
    ) -> DispatchOutcome {
        let tools = self.tool_definitions();
        let req = ChatRequest {
            model: model.to_string(),
            messages,
            tools,
        };

        let resp = match provider.send(&req).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, provider = provider.name(), "LLM call failed");
                return DispatchOutcome::Error {
                    message: e.to_string(),
                };
            }
        };

        if !resp.tool_calls.is_empty() {
            let results = self.handle_function_calls(&resp.message, session_id);
            info!(
                count = results.len(),
                names = ?results.iter().map(|r| r.function_name.as_str()).collect::<Vec<_>>(),
                "executed tool calls"
            );
            DispatchOutcome::FunctionCallsExecuted {
                message: resp.message,
                results,
            }
        } else {
            let content = resp
                .message
                .get("content")
                .and_then(|c| c.as_str())
                .unwrap_or_default()
                .to_string();
            debug!(len = content.len(), "assistant message with no tool calls");
            DispatchOutcome::Message { content }
        }
    }
}

impl Default for FunctionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_function_returns_error_payload() {
        let dispatcher = FunctionDispatcher::new();
        let result = dispatcher.execute_function("nope", &Value::Null, "");
        assert_eq!(result["error"], "Function not found: nope");
    }

    #[test]
    fn tool_message_content_is_a_json_string_not_an_object() {
        let dispatcher = FunctionDispatcher::new();
        let results = vec![FunctionCallResult {
            tool_call_id: "t1".into(),
            function_name: "get_position".into(),
            result: serde_json::json!({"success": true, "data": {"x": 1.0}}),
        }];
        let messages = dispatcher.create_function_call_messages(&results);
        assert!(messages[0]["content"].is_string());
    }
}
