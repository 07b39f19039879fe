use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use botfleet_core::types::DEFAULT_QUERY_TIMEOUT_MS;
use botfleet_querier::query_server_info;
use botfleet_store::models;

use crate::app::AppState;
use crate::http::envelope::{bad_request, internal, not_found, ok, ok_with};

pub async fn list(State(state): State<Arc<AppState>>) -> Response {
    let conn = state.db.lock().await;
    match models::list_servers(&conn) {
        Ok(rows) => ok(json!(rows)),
        Err(e) => internal(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct AddServerRequest {
    host: String,
    port: u16,
}

pub async fn add(State(state): State<Arc<AppState>>, Json(req): Json<AddServerRequest>) -> Response {
    let conn = state.db.lock().await;
    match models::add_server(&conn, &req.host, req.port) {
        Ok(id) => ok(json!({ "id": id })),
        Err(e) => bad_request(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct DeleteServerRequest {
    dbid: i64,
}

pub async fn delete(State(state): State<Arc<AppState>>, Json(req): Json<DeleteServerRequest>) -> Response {
    let conn = state.db.lock().await;
    match models::delete_server(&conn, req.dbid) {
        Ok(true) => ok(json!({ "deleted": true })),
        Ok(false) => not_found("server not found"),
        Err(e) => internal(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct QueryServerRequest {
    server_id: i64,
}

/// Runs a single query cycle for one server on demand, outside the querier
/// worker's normal 30s cadence.
pub async fn query_now(State(state): State<Arc<AppState>>, Json(req): Json<QueryServerRequest>) -> Response {
    let server = {
        let conn = state.db.lock().await;
        match models::get_server(&conn, req.server_id) {
            Ok(Some(row)) => row,
            Ok(None) => return not_found("server not found"),
            Err(e) => return internal(e.to_string()),
        }
    };

    let timeout = Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS);
    match query_server_info(&server, timeout).await {
        Ok((reply, ping)) => {
            let conn = state.db.lock().await;
            if let Err(e) = models::update_server_query_result(
                &conn,
                server.id,
                &reply.hostname,
                &reply.gamemode,
                &reply.language,
                reply.players,
                reply.max_players,
                ping,
            ) {
                return internal(e.to_string());
            }
            ok(json!({ "online": true, "ping": ping, "players": reply.players, "max_players": reply.max_players }))
        }
        Err(e) => ok_with("offline", json!({ "online": false, "error": e.to_string() })),
    }
}
