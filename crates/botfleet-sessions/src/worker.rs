use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;
use serde_json::json;
use tracing::{instrument, warn};
use uuid::Uuid;

use botfleet_bot::Bot;
use botfleet_llm::{DispatchOutcome, FunctionDispatcher, LlmProvider};
use botfleet_world::{SharedWorldPool, StreamableResourcePool};

use crate::manager::SessionManager;
use crate::types::expand_prompt_placeholders;

/// Bots are behind a plain `std::sync::Mutex`, not an async one: tool
/// handlers registered with the dispatcher are synchronous closures and must
/// be able to lock a bot without an executor underneath them.
pub type BotRegistry = DashMap<Uuid, Mutex<Bot>>;

/// Per-bot streamable pools, keyed the same way as [`BotRegistry`].
pub type StreamableRegistry = DashMap<Uuid, Mutex<StreamableResourcePool>>;

/// Every configured LLM provider, keyed by its `llm_providers` row id — a
/// session only stores the id, so the worker resolves the concrete provider
/// fresh each cycle (an operator can add/retire providers at runtime).
pub type ProviderRegistry = DashMap<i64, Arc<dyn LlmProvider>>;

/// Runs one autonomous-update cycle for a single session: snapshots the
/// bot's state, appends it to conversation history, and round-trips through
/// the LLM. Grounded on the original `performAutonomousUpdate` /
/// `processLLMCallback` pair — tool results and the assistant turn that
/// requested them are appended to history in call order.
#[instrument(skip(manager, dispatcher, provider, bots, world, streamables, base_prompt))]
pub async fn perform_autonomous_update(
    manager: &SessionManager,
    dispatcher: &FunctionDispatcher,
    provider: &dyn LlmProvider,
    bots: &BotRegistry,
    world: &SharedWorldPool,
    streamables: &StreamableRegistry,
    base_prompt: &str,
    session_id: &str,
    model: &str,
) {
    let Some(bot_id) = manager.with_session(session_id, |s| {
        s.busy = true;
        s.bot_id
    }) else {
        return;
    };

    let Some(bot_lock) = bots.get(&bot_id) else {
        manager.with_session(session_id, |s| s.busy = false);
        return;
    };

    let (state_snapshot, name, password, bot_prompt) = {
        let mut bot = bot_lock.lock().unwrap();
        let pool_entry = streamables.get(&bot_id);
        let snapshot = match &pool_entry {
            Some(lock) => bot.generate_state_json(world, &lock.lock().unwrap()),
            None => bot.generate_state_json(world, &StreamableResourcePool::new()),
        };
        (snapshot, bot.nickname.clone(), bot.password.clone(), bot.system_prompt.clone())
    };

    // The bot's own prompt is a per-character addendum appended to the base
    // prompt template — placeholders are expanded across the combined text
    // so [NAME]/[SESSION_ID]/[PASSWORD] work in either half.
    let template = if bot_prompt.is_empty() {
        base_prompt.to_string()
    } else {
        format!("{base_prompt}\n\n{bot_prompt}")
    };
    let system_prompt = expand_prompt_placeholders(&template, &name, session_id, &password);

    let messages = manager
        .with_session(session_id, |s| {
            s.push_message(json!({
                "role": "user",
                "content": state_snapshot.to_string(),
            }));

            let mut msgs = vec![json!({"role": "system", "content": system_prompt})];
            msgs.extend(s.conversation_history.iter().cloned());
            msgs
        })
        .unwrap_or_default();

    let outcome = dispatcher
        .call_llm_with_functions(messages, model, provider, session_id)
        .await;

    match outcome {
        DispatchOutcome::FunctionCallsExecuted { message, results } => {
            let tool_messages = dispatcher.create_function_call_messages(&results);
            manager.with_session(session_id, |s| {
                s.push_message(message);
                s.push_messages(tool_messages);
            });
        }
        DispatchOutcome::Message { content } => {
            manager.with_session(session_id, |s| {
                s.push_message(json!({"role": "assistant", "content": content}));
            });
        }
        DispatchOutcome::Error { message } => {
            warn!(session_id, error = %message, "autonomous update failed");
        }
    }

    let now = Instant::now();
    manager.mark_llm_update(session_id, now);
    manager.with_session(session_id, |s| s.busy = false);
}

/// One tick of the background session worker: runs
/// [`perform_autonomous_update`] for every active, non-busy session whose
/// own `llm_update` cooldown has elapsed, resolving each session's own
/// provider (set at `enable_llm` time) out of `providers`.
pub async fn autonomous_update_tick(
    manager: Arc<SessionManager>,
    dispatcher: Arc<FunctionDispatcher>,
    providers: Arc<ProviderRegistry>,
    bots: Arc<BotRegistry>,
    world: Arc<SharedWorldPool>,
    streamables: Arc<StreamableRegistry>,
    base_prompt: Arc<String>,
) {
    let now = Instant::now();
    for session_id in manager.active_session_ids() {
        if !manager.llm_update_allowed(&session_id, now) {
            continue;
        }
        let Some((provider_id, model)) =
            manager.with_session(&session_id, |s| (s.provider_id, s.model.clone()))
        else {
            continue;
        };
        let Some(provider) = providers.get(&provider_id).map(|e| e.clone()) else {
            warn!(session_id, provider_id, "session's LLM provider is no longer configured");
            continue;
        };
        perform_autonomous_update(
            &manager,
            &dispatcher,
            provider.as_ref(),
            &bots,
            &world,
            &streamables,
            &base_prompt,
            &session_id,
            &model,
        )
        .await;
    }
}
