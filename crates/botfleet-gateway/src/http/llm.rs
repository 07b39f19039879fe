use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use botfleet_llm::OpenAiCompatProvider;
use botfleet_store::models;

use crate::app::AppState;
use crate::http::envelope::{bad_request, forbidden, internal, not_found, ok};

pub async fn list(State(state): State<Arc<AppState>>) -> Response {
    let conn = state.db.lock().await;
    match models::list_providers(&conn) {
        Ok(rows) => ok(json!(rows)),
        Err(e) => internal(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct GetProviderQuery {
    id: i64,
}

pub async fn get(State(state): State<Arc<AppState>>, Query(q): Query<GetProviderQuery>) -> Response {
    let conn = state.db.lock().await;
    match models::get_provider(&conn, q.id) {
        Ok(Some(row)) => ok(json!(row)),
        Ok(None) => not_found("provider not found"),
        Err(e) => internal(e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct CreateProviderRequest {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
}

/// Inserts the provider row, then instantiates and registers the live
/// `OpenAiCompatProvider` so existing and future sessions can use it
/// immediately without a restart.
pub async fn create(State(state): State<Arc<AppState>>, Json(req): Json<CreateProviderRequest>) -> Response {
    let id = {
        let conn = state.db.lock().await;
        match models::insert_provider(&conn, &req.name, &req.api_key, &req.base_url, &req.model) {
            Ok(id) => id,
            Err(e) => return bad_request(e.to_string()),
        }
    };

    let provider = OpenAiCompatProvider::new(req.name, req.api_key, req.base_url);
    state.providers.insert(id, Arc::new(provider));

    ok(json!({ "id": id }))
}

#[derive(Deserialize)]
pub struct UpdateProviderRequest {
    id: i64,
    name: String,
    base_url: String,
    api_key: String,
    model: String,
}

pub async fn update(State(state): State<Arc<AppState>>, Json(req): Json<UpdateProviderRequest>) -> Response {
    {
        let conn = state.db.lock().await;
        match models::update_provider(&conn, req.id, &req.name, &req.api_key, &req.base_url, &req.model) {
            Ok(true) => {}
            Ok(false) => return not_found("provider not found"),
            Err(e) => return internal(e.to_string()),
        }
    }

    let provider = OpenAiCompatProvider::new(req.name, req.api_key, req.base_url);
    state.providers.insert(req.id, Arc::new(provider));

    ok(json!({ "updated": true }))
}

#[derive(Deserialize)]
pub struct DeleteProviderRequest {
    id: i64,
}

/// 403s if any active session still references the provider — a provider
/// can't be pulled out from under a live LLM session.
pub async fn delete(State(state): State<Arc<AppState>>, Json(req): Json<DeleteProviderRequest>) -> Response {
    let conn = state.db.lock().await;
    match models::provider_in_use(&conn, req.id) {
        Ok(true) => return forbidden("provider is in use by an active session"),
        Ok(false) => {}
        Err(e) => return internal(e.to_string()),
    }

    match models::delete_provider(&conn, req.id) {
        Ok(true) => {
            state.providers.remove(&req.id);
            ok(json!({ "deleted": true }))
        }
        Ok(false) => not_found("provider not found"),
        Err(e) => internal(e.to_string()),
    }
}
