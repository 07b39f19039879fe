use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::json;

use botfleet_core::types::BotStatus;
use botfleet_store::models;

use crate::app::AppState;
use crate::http::envelope::{internal, ok};

pub async fn runtime(State(state): State<Arc<AppState>>) -> Response {
    ok(json!({
        "uptime_secs": state.uptime_secs(),
        "bot_count": state.bots.len(),
        "active_sessions": state.sessions.active_session_ids().len(),
        "providers": state.providers.len(),
    }))
}

pub async fn bot_stats(State(state): State<Arc<AppState>>) -> Response {
    let mut disconnected = 0u32;
    let mut connecting = 0u32;
    let mut wait_for_join = 0u32;
    let mut connected = 0u32;
    let mut spawned = 0u32;

    for entry in state.bots.iter() {
        match entry.value().lock().unwrap().status {
            BotStatus::Disconnected => disconnected += 1,
            BotStatus::Connecting => connecting += 1,
            BotStatus::WaitForJoin => wait_for_join += 1,
            BotStatus::Connected => connected += 1,
            BotStatus::Spawned => spawned += 1,
        }
    }

    ok(json!({
        "total": state.bots.len(),
        "disconnected": disconnected,
        "connecting": connecting,
        "wait_for_join": wait_for_join,
        "connected": connected,
        "spawned": spawned,
    }))
}

/// A server counts as "online" if its last successful query was within the
/// last 5 minutes — a fixed window independent of the querier worker's own
/// polling cadence.
const ONLINE_WINDOW_SECS: i64 = 5 * 60;

pub async fn server_stats(State(state): State<Arc<AppState>>) -> Response {
    let conn = state.db.lock().await;
    let servers = match models::list_servers(&conn) {
        Ok(rows) => rows,
        Err(e) => return internal(e.to_string()),
    };
    drop(conn);

    let now = Utc::now();
    let stats: Vec<_> = servers
        .into_iter()
        .map(|s| {
            let online = s
                .last_update
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|ts| (now - ts.with_timezone(&Utc)).num_seconds() <= ONLINE_WINDOW_SECS)
                .unwrap_or(false);
            json!({
                "id": s.id,
                "host": s.host,
                "port": s.port,
                "online": online,
                "players": s.players,
                "max_players": s.max_players,
                "ping": s.ping,
                "last_update": s.last_update,
            })
        })
        .collect();

    ok(json!(stats))
}

pub async fn health() -> Response {
    ok(json!({ "status": "ok" }))
}
