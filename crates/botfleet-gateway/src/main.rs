use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;
use rusqlite::Connection;
use tracing::{error, info, warn};
use uuid::Uuid;

use botfleet_bot::Bot;
use botfleet_core::config::BotFleetConfig;
use botfleet_core::types::ServerAddress;
use botfleet_llm::{FunctionDispatcher, OpenAiCompatProvider};
use botfleet_queue::{ConnectionPolicy, ConnectionQueue};
use botfleet_sessions::SessionManager;
use botfleet_store::models;
use botfleet_transport::MockTransport;
use botfleet_tools::context::ToolContext;
use botfleet_world::{SharedWorldPool, StreamableResourcePool};

mod app;
mod console;
mod http;
mod tick;
mod web;
mod workers;

/// Maps the config's on-disk admission policy onto the queue crate's own
/// enum — kept distinct because `botfleet-queue` doesn't depend on
/// `botfleet-core::config` (it only needs the policy shape, not how it's
/// loaded).
fn queue_policy(cfg: botfleet_core::config::ConnectionPolicy) -> ConnectionPolicy {
    match cfg {
        botfleet_core::config::ConnectionPolicy::Queued => ConnectionPolicy::Queued,
        botfleet_core::config::ConnectionPolicy::Aggressive => ConnectionPolicy::Aggressive,
    }
}

/// Rebuilds every bot's in-memory runtime state (transport slot, streamable
/// pool, insertion order) from its persisted row. Bots always start
/// `Disconnected` on restart — the tick loop's own admission pass handles
/// getting them back online.
fn restore_bots(
    conn: &Connection,
    bots: &DashMap<Uuid, Mutex<Bot>>,
    transports: &DashMap<Uuid, Mutex<Box<dyn botfleet_transport::Transport>>>,
    streamables: &DashMap<Uuid, Mutex<StreamableResourcePool>>,
    bot_order: &mut Vec<Uuid>,
) -> anyhow::Result<()> {
    for row in models::list_bots(conn)? {
        let Some(server) = models::get_server(conn, row.server_id)? else {
            warn!(bot = %row.uuid, server_id = row.server_id, "bot references a missing server, skipping");
            continue;
        };
        let id = Uuid::parse_str(&row.uuid)?;

        let mut bot = Bot::new(
            ServerAddress::new(server.host, server.port),
            row.name,
            row.password,
            row.system_prompt,
        );
        bot.invulnerable = row.invulnerable;

        bots.insert(id, Mutex::new(bot));
        transports.insert(id, Mutex::new(Box::new(MockTransport::new())));
        streamables.insert(id, Mutex::new(StreamableResourcePool::new()));
        bot_order.push(id);
    }
    Ok(())
}

/// Rebuilds live `LlmSession`s for bots that still had an active session
/// row before the last restart, so LLM-driven autonomy resumes without an
/// operator re-enabling it. New session ids are minted (sessions aren't
/// themselves durable, only the "this bot has LLM enabled" fact is) and
/// the persisted row is rewritten to match.
fn restore_llm_sessions(
    conn: &Connection,
    sessions: &SessionManager,
    providers: &DashMap<i64, Arc<dyn botfleet_llm::LlmProvider>>,
) -> anyhow::Result<()> {
    for (bot_uuid, provider_id) in models::active_llm_sessions(conn)? {
        let Ok(bot_id) = Uuid::parse_str(&bot_uuid) else { continue };
        let Some(provider_row) = models::get_provider(conn, provider_id)? else {
            warn!(bot = %bot_uuid, provider_id, "bot's llm provider no longer exists, leaving llm disabled");
            models::deactivate_llm_session(conn, &bot_uuid)?;
            continue;
        };

        if !providers.contains_key(&provider_id) {
            let provider = OpenAiCompatProvider::new(
                provider_row.name.clone(),
                provider_row.api_key.clone(),
                provider_row.base_url.clone(),
            );
            providers.insert(provider_id, Arc::new(provider));
        }

        let session_id = sessions.create_session(bot_id, provider_id, provider_row.model);
        models::deactivate_llm_session(conn, &bot_uuid)?;
        models::insert_llm_session(conn, &session_id, &bot_uuid, provider_id)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botfleet_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("BOTFLEET_CONFIG").ok();
    let config = BotFleetConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "config load failed, using defaults");
        BotFleetConfig::default()
    });

    let base_prompt = botfleet_core::config::load_base_prompt(None).unwrap_or_else(|e| {
        warn!(error = %e, "base prompt load failed, using empty prompt");
        String::new()
    });

    let mut conn = Connection::open(&config.database_path)?;
    botfleet_store::init_db(&mut conn)?;

    let bots: Arc<DashMap<Uuid, Mutex<Bot>>> = Arc::new(DashMap::new());
    let transports: Arc<DashMap<Uuid, Mutex<Box<dyn botfleet_transport::Transport>>>> = Arc::new(DashMap::new());
    let streamables: Arc<DashMap<Uuid, Mutex<StreamableResourcePool>>> = Arc::new(DashMap::new());
    let world = Arc::new(SharedWorldPool::new());
    let mut bot_order = Vec::new();
    restore_bots(&conn, &bots, &transports, &streamables, &mut bot_order)?;

    let sessions = Arc::new(SessionManager::new());
    let providers: Arc<DashMap<i64, Arc<dyn botfleet_llm::LlmProvider>>> = Arc::new(DashMap::new());
    for row in models::list_providers(&conn)? {
        let provider = OpenAiCompatProvider::new(row.name.clone(), row.api_key.clone(), row.base_url.clone());
        providers.insert(row.id, Arc::new(provider));
    }
    restore_llm_sessions(&conn, &sessions, &providers)?;

    let tool_ctx = Arc::new(ToolContext {
        sessions: sessions.clone(),
        bots: bots.clone(),
        transports: transports.clone(),
        world: world.clone(),
        streamables: streamables.clone(),
    });
    let mut dispatcher = FunctionDispatcher::new().with_cooldown_gate(sessions.clone());
    botfleet_tools::tools::register_all(&mut dispatcher, tool_ctx);

    let (shutdown_tx, _) = tokio::sync::watch::channel(false);

    let state = Arc::new(app::AppState {
        config: config.clone(),
        db: Arc::new(tokio::sync::Mutex::new(conn)),
        bots,
        transports,
        streamables,
        world,
        sessions,
        dispatcher: Arc::new(dispatcher),
        providers,
        connection_queue: ConnectionQueue::new(queue_policy(config.connection_policy)),
        bot_order: Mutex::new(bot_order),
        base_prompt: Arc::new(base_prompt),
        started_at: Instant::now(),
        web_assets: web::WebAssets::load(),
        shutdown_tx,
    });

    let tick_handle = workers::spawn_tick_worker(state.clone());
    let session_handle = workers::spawn_session_worker(state.clone());
    let querier_handle = workers::spawn_querier_worker(state.clone());
    let console_handle = std::thread::Builder::new()
        .name("botfleet-console".to_string())
        .spawn({
            let state = state.clone();
            move || console::run(state)
        })?;

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = rt.block_on(serve(state.clone()));

    state.shutdown_tx.send(true).ok();
    for handle in [tick_handle, session_handle, querier_handle] {
        let _ = handle.join();
    }
    // The console thread is blocked on a stdin read, which doesn't observe
    // the shutdown signal until the next newline — don't wait on it.
    drop(console_handle);

    result?;
    Ok(())
}

async fn serve(state: Arc<app::AppState>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", state.config.api_port).parse()?;
    info!(%addr, "botfleet gateway listening");

    let router = app::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for entry in state.transports.iter() {
        if let Err(e) = entry.value().lock().unwrap().disconnect().await {
            error!(bot_id = %entry.key(), error = ?e, "failed to disconnect bot during shutdown");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received");
}
