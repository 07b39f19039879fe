use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use botfleet_core::types::{DEFAULT_ACTION_COOLDOWN_SECS, DEFAULT_LLM_UPDATE_COOLDOWN_SECS, DEFAULT_SESSION_TIMEOUT_SECS};
use botfleet_llm::ActionCooldownGate;

use crate::types::LlmSession;

/// Owns every live LLM session and the canonical `botUuid -> sessionId`
/// reverse map — a bot may have at most one active session, so the map is
/// always in this direction (never `sessionId -> botUuid` as the primary
/// key), matching how the autonomous-update worker looks sessions up by bot.
pub struct SessionManager {
    sessions: DashMap<String, Mutex<LlmSession>>,
    bot_to_session: DashMap<Uuid, String>,
    action_cooldown: Duration,
    llm_update_cooldown: Duration,
    session_timeout: Duration,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::with_cooldowns(
            Duration::from_secs(DEFAULT_ACTION_COOLDOWN_SECS),
            Duration::from_secs(DEFAULT_LLM_UPDATE_COOLDOWN_SECS),
            Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS),
        )
    }

    pub fn with_cooldowns(action_cooldown: Duration, llm_update_cooldown: Duration, session_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            bot_to_session: DashMap::new(),
            action_cooldown,
            llm_update_cooldown,
            session_timeout,
        }
    }

    /// Creates a new session for `bot_id`, replacing any prior session that
    /// bot owned.
    #[instrument(skip(self))]
    pub fn create_session(&self, bot_id: Uuid, provider_id: i64, model: impl Into<String>) -> String {
        let session = LlmSession::new(bot_id, provider_id, model);
        let id = session.id.clone();
        if let Some(old_id) = self.bot_to_session.insert(bot_id, id.clone()) {
            self.sessions.remove(&old_id);
        }
        self.sessions.insert(id.clone(), Mutex::new(session));
        id
    }

    pub fn session_id_for_bot(&self, bot_id: Uuid) -> Option<String> {
        self.bot_to_session.get(&bot_id).map(|e| e.clone())
    }

    /// Runs `f` against the session's locked state, if it still exists.
    pub fn with_session<R>(&self, session_id: &str, f: impl FnOnce(&mut LlmSession) -> R) -> Option<R> {
        let entry = self.sessions.get(session_id)?;
        let mut guard = entry.lock().unwrap();
        Some(f(&mut guard))
    }

    pub fn remove_session(&self, session_id: &str) {
        if let Some((_, locked)) = self.sessions.remove(session_id) {
            let bot_id = locked.lock().unwrap().bot_id;
            self.bot_to_session.remove(&bot_id);
        }
    }

    /// Every active, non-busy session id — the candidate set the
    /// autonomous-update worker iterates each tick.
    pub fn active_session_ids(&self) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|e| {
                let s = e.value().lock().unwrap();
                s.active && !s.busy
            })
            .map(|e| e.key().clone())
            .collect()
    }

    /// True if `session_id`'s own autonomous-update cooldown has elapsed.
    /// Distinct from (and composes with) the dispatcher's per-action
    /// cooldown: a tool call can be off cooldown while the session's
    /// autonomous-update cycle is still waiting, and vice versa.
    pub fn llm_update_allowed(&self, session_id: &str, now: Instant) -> bool {
        self.with_session(session_id, |s| match s.last_llm_update {
            None => true,
            Some(last) => now.duration_since(last) >= self.llm_update_cooldown,
        })
        .unwrap_or(false)
    }

    pub fn mark_llm_update(&self, session_id: &str, now: Instant) {
        self.with_session(session_id, |s| s.last_llm_update = Some(now));
    }

    /// Removes every session whose last activity predates the configured
    /// idle timeout.
    pub fn garbage_collect(&self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| now.duration_since(e.value().lock().unwrap().last_activity) >= self.session_timeout)
            .map(|e| e.key().clone())
            .collect();

        for id in &expired {
            self.remove_session(id);
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "garbage-collected idle sessions");
        }
        expired.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionCooldownGate for SessionManager {
    fn check_cooldown(&self, session_id: &str, action: &str) -> bool {
        self.with_session(session_id, |s| match s.action_cooldowns.get(action) {
            None => true,
            Some(last) => Instant::now().duration_since(*last) >= self.action_cooldown,
        })
        .unwrap_or(true)
    }

    fn set_cooldown(&self, session_id: &str, action: &str) {
        self.with_session(session_id, |s| {
            s.action_cooldowns.insert(action.to_string(), Instant::now());
        });
    }

    fn touch_activity(&self, session_id: &str) {
        self.with_session(session_id, |s| s.last_activity = Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_session_replaces_a_bots_prior_session() {
        let manager = SessionManager::new();
        let bot_id = Uuid::new_v4();
        let first = manager.create_session(bot_id, 1, "gpt-4o-mini");
        let second = manager.create_session(bot_id, 1, "gpt-4o-mini");

        assert_ne!(first, second);
        assert_eq!(manager.session_id_for_bot(bot_id), Some(second.clone()));
        assert!(manager.with_session(&first, |_| ()).is_none());
    }

    #[test]
    fn action_cooldown_and_llm_update_cooldown_are_independent() {
        let manager = SessionManager::with_cooldowns(
            Duration::from_secs(2),
            Duration::from_secs(10),
            Duration::from_secs(1800),
        );
        let bot_id = Uuid::new_v4();
        let session_id = manager.create_session(bot_id, 1, "gpt-4o-mini");

        assert!(manager.check_cooldown(&session_id, "goto"));
        manager.set_cooldown(&session_id, "goto");
        assert!(!manager.check_cooldown(&session_id, "goto"));

        // The action cooldown being active must not block the (separate)
        // llm_update cooldown, which has never been touched.
        assert!(manager.llm_update_allowed(&session_id, Instant::now()));
    }

    #[test]
    fn garbage_collect_drops_idle_sessions_past_timeout() {
        let manager = SessionManager::with_cooldowns(
            Duration::from_secs(2),
            Duration::from_secs(10),
            Duration::from_millis(50),
        );
        let bot_id = Uuid::new_v4();
        let session_id = manager.create_session(bot_id, 1, "gpt-4o-mini");

        let later = Instant::now() + Duration::from_millis(100);
        let removed = manager.garbage_collect(later);
        assert_eq!(removed, 1);
        assert!(manager.with_session(&session_id, |_| ()).is_none());
        assert_eq!(manager.session_id_for_bot(bot_id), None);
    }
}
