use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use rusqlite::Connection;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use botfleet_core::config::BotFleetConfig;
use botfleet_llm::FunctionDispatcher;
use botfleet_queue::ConnectionQueue;
use botfleet_sessions::{BotRegistry, ProviderRegistry, SessionManager};
use botfleet_transport::Transport;
use botfleet_world::{SharedWorldPool, StreamableResourcePool};

use crate::web::WebAssets;

/// Central shared state — passed as `Arc<AppState>` to every worker thread
/// and Axum handler. Grounded on the original `App` singleton: one value
/// constructed at startup and explicitly threaded everywhere, no process
/// globals beyond the shutdown flag.
pub struct AppState {
    pub config: BotFleetConfig,
    pub db: Arc<tokio::sync::Mutex<Connection>>,

    pub bots: Arc<BotRegistry>,
    pub transports: Arc<dashmap::DashMap<Uuid, Mutex<Box<dyn Transport>>>>,
    pub streamables: Arc<dashmap::DashMap<Uuid, Mutex<StreamableResourcePool>>>,
    pub world: Arc<SharedWorldPool>,

    pub sessions: Arc<SessionManager>,
    pub dispatcher: Arc<FunctionDispatcher>,
    pub providers: Arc<ProviderRegistry>,

    pub connection_queue: ConnectionQueue,
    /// Fleet insertion order — the admission queue and tick loop both need a
    /// stable iteration order that `DashMap` doesn't provide.
    pub bot_order: Mutex<Vec<Uuid>>,

    pub base_prompt: Arc<String>,
    pub started_at: Instant,
    pub web_assets: WebAssets,

    /// Broadcasts `true` once on shutdown; every worker thread watches it.
    pub shutdown_tx: tokio::sync::watch::Sender<bool>,
}

impl AppState {
    pub fn shutdown_rx(&self) -> tokio::sync::watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Assembles the full Axum router. CORS is permissive across every route —
/// the control plane is meant to be driven from an operator's own web UI
/// served from an arbitrary origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/bot/list", get(crate::http::bots::list))
        .route("/api/bot/create", post(crate::http::bots::create))
        .route("/api/bot/delete", post(crate::http::bots::delete))
        .route("/api/bot/set_password", post(crate::http::bots::set_password))
        .route("/api/bot/reconnect", post(crate::http::bots::reconnect))
        .route("/api/bot/enable_llm", post(crate::http::bots::enable_llm))
        .route("/api/bot/disable_llm", post(crate::http::bots::disable_llm))
        .route("/api/bot/update_prompt", post(crate::http::bots::update_prompt))
        .route("/api/server/list", get(crate::http::servers::list))
        .route("/api/server/add", post(crate::http::servers::add))
        .route("/api/server/delete", post(crate::http::servers::delete))
        .route("/api/server/query", post(crate::http::servers::query_now))
        .route("/api/llm/list", get(crate::http::llm::list))
        .route("/api/llm/create", post(crate::http::llm::create))
        .route("/api/llm/update", post(crate::http::llm::update))
        .route("/api/llm/delete", post(crate::http::llm::delete))
        .route("/api/llm/get", get(crate::http::llm::get))
        .route("/api/dashboard/runtime", get(crate::http::dashboard::runtime))
        .route("/api/dashboard/bot_stats", get(crate::http::dashboard::bot_stats))
        .route("/api/dashboard/server_stats", get(crate::http::dashboard::server_stats))
        .route("/health", get(crate::http::dashboard::health))
        .route("/web/{*path}", get(crate::web::serve))
        .route("/web/", get(crate::web::serve_index))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
