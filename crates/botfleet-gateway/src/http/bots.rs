use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use botfleet_bot::Bot;
use botfleet_core::types::ServerAddress;
use botfleet_store::models;
use botfleet_transport::MockTransport;
use botfleet_world::StreamableResourcePool;

use crate::app::AppState;
use crate::http::envelope::{bad_request, internal, not_found, ok};

fn parse_uuid(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| bad_request("invalid uuid"))
}

pub async fn list(State(state): State<Arc<AppState>>) -> Response {
    let conn = state.db.lock().await;
    match models::list_bots(&conn) {
        Ok(rows) => ok(json!(rows)),
        Err(e) => internal(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct CreateBotRequest {
    name: String,
    server_id: i64,
    #[serde(default)]
    invulnerable: bool,
    #[serde(default)]
    system_prompt: String,
    #[serde(default)]
    password: String,
    llm_provider_id: Option<i64>,
}

/// Inserts the bot row, then wires up its full in-memory runtime state: a
/// queued `Bot`, a transport slot, and an empty streamable pool — mirroring
/// what `main.rs` does for bots restored from the database at startup. The
/// bot starts `Disconnected`; the tick loop's admission pass picks it up on
/// its own next cycle, same as any reconnect.
pub async fn create(State(state): State<Arc<AppState>>, Json(req): Json<CreateBotRequest>) -> Response {
    let server = {
        let conn = state.db.lock().await;
        match models::get_server(&conn, req.server_id) {
            Ok(Some(row)) => row,
            Ok(None) => return not_found("server not found"),
            Err(e) => return internal(e.to_string()),
        }
    };

    let mut bot = Bot::new(
        ServerAddress::new(server.host, server.port),
        req.name.clone(),
        req.password.clone(),
        req.system_prompt.clone(),
    );
    bot.invulnerable = req.invulnerable;
    let bot_id = bot.id;

    {
        let conn = state.db.lock().await;
        if let Err(e) = models::insert_bot(
            &conn,
            &bot_id.to_string(),
            &req.name,
            req.server_id,
            req.invulnerable,
            &req.password,
            &req.system_prompt,
        ) {
            return bad_request(e.to_string());
        }
    }

    state.bots.insert(bot_id, Mutex::new(bot));
    state.transports.insert(bot_id, Mutex::new(Box::new(MockTransport::new())));
    state.streamables.insert(bot_id, Mutex::new(StreamableResourcePool::new()));
    state.bot_order.lock().unwrap().push(bot_id);

    if let Some(provider_id) = req.llm_provider_id {
        if let Err(resp) = enable_llm_for_bot(&state, bot_id, provider_id).await {
            return resp;
        }
    }

    ok(json!({ "uuid": bot_id.to_string() }))
}

#[derive(Deserialize)]
pub struct BotUuidRequest {
    uuid: String,
}

/// Tears down every in-memory trace of the bot alongside its database row —
/// live transport, streamable pool, and (if any) active LLM session.
pub async fn delete(State(state): State<Arc<AppState>>, Json(req): Json<BotUuidRequest>) -> Response {
    let bot_id = match parse_uuid(&req.uuid) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    {
        let conn = state.db.lock().await;
        match models::delete_bot(&conn, &req.uuid) {
            Ok(true) => {}
            Ok(false) => return not_found("bot not found"),
            Err(e) => return internal(e.to_string()),
        }
    }

    state.bots.remove(&bot_id);
    state.transports.remove(&bot_id);
    state.streamables.remove(&bot_id);
    if let Some(session_id) = state.sessions.session_id_for_bot(bot_id) {
        state.sessions.remove_session(&session_id);
    }
    state.bot_order.lock().unwrap().retain(|id| *id != bot_id);

    ok(json!({ "deleted": true }))
}

#[derive(Deserialize)]
pub struct SetPasswordRequest {
    uuid: String,
    password: String,
}

pub async fn set_password(State(state): State<Arc<AppState>>, Json(req): Json<SetPasswordRequest>) -> Response {
    let bot_id = match parse_uuid(&req.uuid) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    {
        let conn = state.db.lock().await;
        match models::set_bot_password(&conn, &req.uuid, &req.password) {
            Ok(true) => {}
            Ok(false) => return not_found("bot not found"),
            Err(e) => return internal(e.to_string()),
        }
    }

    match state.bots.get(&bot_id) {
        Some(entry) => {
            entry.lock().unwrap().password = req.password;
            ok(json!({ "updated": true }))
        }
        None => not_found("bot not found"),
    }
}

/// Operator override of the normal reconnect backoff: forces the bot back
/// to `Disconnected` with its delay already elapsed so the next admission
/// cycle re-admits it immediately.
pub async fn reconnect(State(state): State<Arc<AppState>>, Json(req): Json<BotUuidRequest>) -> Response {
    let bot_id = match parse_uuid(&req.uuid) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.bots.get(&bot_id) {
        Some(entry) => {
            entry.lock().unwrap().force_reconnect();
            ok(json!({ "reconnecting": true }))
        }
        None => not_found("bot not found"),
    }
}

#[derive(Deserialize)]
pub struct EnableLlmRequest {
    uuid: String,
    provider_id: i64,
}

async fn enable_llm_for_bot(state: &Arc<AppState>, bot_id: Uuid, provider_id: i64) -> Result<(), Response> {
    let provider_row = {
        let conn = state.db.lock().await;
        match models::get_provider(&conn, provider_id) {
            Ok(Some(row)) => row,
            Ok(None) => return Err(not_found("llm provider not found")),
            Err(e) => return Err(internal(e.to_string())),
        }
    };

    if !state.providers.contains_key(&provider_id) {
        let provider = botfleet_llm::OpenAiCompatProvider::new(
            provider_row.name.clone(),
            provider_row.api_key.clone(),
            provider_row.base_url.clone(),
        );
        state.providers.insert(provider_id, Arc::new(provider));
    }

    let session_id = state.sessions.create_session(bot_id, provider_id, provider_row.model);

    let conn = state.db.lock().await;
    if let Err(e) = models::insert_llm_session(&conn, &session_id, &bot_id.to_string(), provider_id) {
        return Err(internal(e.to_string()));
    }
    Ok(())
}

pub async fn enable_llm(State(state): State<Arc<AppState>>, Json(req): Json<EnableLlmRequest>) -> Response {
    let bot_id = match parse_uuid(&req.uuid) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if !state.bots.contains_key(&bot_id) {
        return not_found("bot not found");
    }

    match enable_llm_for_bot(&state, bot_id, req.provider_id).await {
        Ok(()) => ok(json!({ "enabled": true })),
        Err(resp) => resp,
    }
}

pub async fn disable_llm(State(state): State<Arc<AppState>>, Json(req): Json<BotUuidRequest>) -> Response {
    let bot_id = match parse_uuid(&req.uuid) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    if let Some(session_id) = state.sessions.session_id_for_bot(bot_id) {
        state.sessions.remove_session(&session_id);
    }

    let conn = state.db.lock().await;
    if let Err(e) = models::deactivate_llm_session(&conn, &req.uuid) {
        return internal(e.to_string());
    }

    ok(json!({ "disabled": true }))
}

#[derive(Deserialize)]
pub struct UpdatePromptRequest {
    uuid: String,
    system_prompt: String,
}

pub async fn update_prompt(State(state): State<Arc<AppState>>, Json(req): Json<UpdatePromptRequest>) -> Response {
    let bot_id = match parse_uuid(&req.uuid) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    {
        let conn = state.db.lock().await;
        match models::update_bot_prompt(&conn, &req.uuid, &req.system_prompt) {
            Ok(true) => {}
            Ok(false) => return not_found("bot not found"),
            Err(e) => return internal(e.to_string()),
        }
    }

    match state.bots.get(&bot_id) {
        Some(entry) => {
            entry.lock().unwrap().system_prompt = req.system_prompt;
            ok(json!({ "updated": true }))
        }
        None => not_found("bot not found"),
    }
}
