use std::sync::Mutex;

use dashmap::DashMap;
use uuid::Uuid;

use botfleet_bot::Bot;
use botfleet_sessions::SessionManager;
use botfleet_transport::Transport;
use botfleet_world::{SharedWorldPool, StreamableResourcePool};

/// Everything a tool handler needs to resolve a session to a bot and reach
/// its world view. Handlers are synchronous closures registered with the
/// dispatcher, so every shared structure here uses a blocking `Mutex`/
/// `DashMap`, never an async one.
pub struct ToolContext {
    pub sessions: std::sync::Arc<SessionManager>,
    pub bots: std::sync::Arc<DashMap<Uuid, Mutex<Bot>>>,
    pub transports: std::sync::Arc<DashMap<Uuid, Mutex<Box<dyn Transport>>>>,
    pub world: std::sync::Arc<SharedWorldPool>,
    pub streamables: std::sync::Arc<DashMap<Uuid, Mutex<StreamableResourcePool>>>,
}

impl ToolContext {
    pub fn bot_id_for_session(&self, session_id: &str) -> Option<Uuid> {
        self.sessions.with_session(session_id, |s| s.bot_id)
    }
}

pub fn error(message: impl Into<String>) -> serde_json::Value {
    serde_json::json!({ "error": message.into() })
}

pub fn success(data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "success": true, "data": data })
}
