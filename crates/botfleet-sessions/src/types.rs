use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use rand::Rng;
use serde_json::Value;
use uuid::Uuid;

use botfleet_core::types::MAX_CONVERSATION_HISTORY;

/// Generates a 16-character lowercase hex session id.
pub fn new_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap())
        .collect()
}

/// One LLM conversation bound to a single bot. Grounded on the original
/// `CLLMBotSession`: a bounded rolling history, a per-action cooldown map
/// enforced by the dispatcher, and a separate cooldown on the session's own
/// autonomous-update cycle.
pub struct LlmSession {
    pub id: String,
    pub bot_id: Uuid,
    pub provider_id: i64,
    pub model: String,
    pub conversation_history: VecDeque<Value>,
    pub action_cooldowns: HashMap<String, Instant>,
    pub last_activity: Instant,
    pub last_llm_update: Option<Instant>,
    /// True while an autonomous-update or tool-triggered LLM round-trip is
    /// in flight; the worker skips sessions with this set rather than
    /// queuing a second concurrent call.
    pub busy: bool,
    pub active: bool,
}

impl LlmSession {
    pub fn new(bot_id: Uuid, provider_id: i64, model: impl Into<String>) -> Self {
        Self {
            id: new_session_id(),
            bot_id,
            provider_id,
            model: model.into(),
            conversation_history: VecDeque::with_capacity(MAX_CONVERSATION_HISTORY),
            action_cooldowns: HashMap::new(),
            last_activity: Instant::now(),
            last_llm_update: None,
            busy: false,
            active: true,
        }
    }

    pub fn push_message(&mut self, message: Value) {
        if self.conversation_history.len() >= MAX_CONVERSATION_HISTORY {
            self.conversation_history.pop_front();
        }
        self.conversation_history.push_back(message);
    }

    pub fn push_messages(&mut self, messages: impl IntoIterator<Item = Value>) {
        for m in messages {
            self.push_message(m);
        }
    }
}

/// Expands `[NAME]`, `[SESSION_ID]`, and `[PASSWORD]` placeholders in a
/// system prompt template. Expansion is a single greedy left-to-right pass —
/// substituted text is never re-scanned for further placeholders.
pub fn expand_prompt_placeholders(template: &str, name: &str, session_id: &str, password: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let Some(pos) = rest.find('[') else {
            out.push_str(rest);
            break;
        };
        let (before, after_bracket) = rest.split_at(pos);
        out.push_str(before);

        let replacement = if let Some(tail) = after_bracket.strip_prefix("[NAME]") {
            rest = tail;
            Some(name)
        } else if let Some(tail) = after_bracket.strip_prefix("[SESSION_ID]") {
            rest = tail;
            Some(session_id)
        } else if let Some(tail) = after_bracket.strip_prefix("[PASSWORD]") {
            rest = tail;
            Some(password)
        } else {
            None
        };

        match replacement {
            Some(value) => out.push_str(value),
            None => {
                // Not a recognized placeholder — emit the bracket literally
                // and keep scanning from just past it.
                out.push('[');
                rest = &after_bracket[1..];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_16_hex_chars() {
        let id = new_session_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn expand_prompt_replaces_all_known_placeholders() {
        let out = expand_prompt_placeholders(
            "I am [NAME], session [SESSION_ID], pw [PASSWORD].",
            "Bot1",
            "abc123",
            "secret",
        );
        assert_eq!(out, "I am Bot1, session abc123, pw secret.");
    }

    #[test]
    fn expand_prompt_leaves_unknown_brackets_untouched() {
        let out = expand_prompt_placeholders("see [UNKNOWN] tag", "n", "s", "p");
        assert_eq!(out, "see [UNKNOWN] tag");
    }

    #[test]
    fn expand_prompt_does_not_rescan_substituted_text() {
        // If [NAME] expands to a literal "[SESSION_ID]" it must not be
        // expanded again — a single left-to-right pass only.
        let out = expand_prompt_placeholders("[NAME]", "[SESSION_ID]", "real-id", "p");
        assert_eq!(out, "[SESSION_ID]");
    }
}
