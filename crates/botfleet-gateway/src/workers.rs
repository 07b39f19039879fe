use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use botfleet_core::types::{DEFAULT_SESSION_UPDATE_INTERVAL_SECS, TICK_PERIOD_MS};

use crate::app::AppState;
use crate::tick::run_tick;

/// Spawns a dedicated OS thread driving a current-thread Tokio runtime —
/// not `tokio::spawn` — so the tick loop can hold a bot's/transport's
/// `std::sync::Mutex` guard across an `.await` without a multi-thread
/// executor potentially parking the task elsewhere mid-lock.
fn spawn_dedicated<F>(name: &'static str, future: F) -> std::thread::JoinHandle<()>
where
    F: std::future::Future<Output = ()> + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build worker runtime");
            rt.block_on(future);
        })
        .expect("failed to spawn worker thread")
}

pub fn spawn_tick_worker(state: Arc<AppState>) -> std::thread::JoinHandle<()> {
    spawn_dedicated("botfleet-tick", async move {
        let mut shutdown = state.shutdown_rx();
        let mut ticker = tokio::time::interval(Duration::from_millis(TICK_PERIOD_MS));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_tick(&state).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("tick worker shutting down");
                        break;
                    }
                }
            }
        }
    })
}

pub fn spawn_session_worker(state: Arc<AppState>) -> std::thread::JoinHandle<()> {
    spawn_dedicated("botfleet-sessions", async move {
        let mut shutdown = state.shutdown_rx();
        let mut ticker = tokio::time::interval(Duration::from_secs(DEFAULT_SESSION_UPDATE_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    botfleet_sessions::autonomous_update_tick(
                        state.sessions.clone(),
                        state.dispatcher.clone(),
                        state.providers.clone(),
                        state.bots.clone(),
                        state.world.clone(),
                        state.streamables.clone(),
                        state.base_prompt.clone(),
                    )
                    .await;
                    state.sessions.garbage_collect(std::time::Instant::now());
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("session worker shutting down");
                        break;
                    }
                }
            }
        }
    })
}

pub fn spawn_querier_worker(state: Arc<AppState>) -> std::thread::JoinHandle<()> {
    spawn_dedicated("botfleet-querier", async move {
        let shutdown = state.shutdown_rx();
        botfleet_querier::run(state.db.clone(), botfleet_querier::default_interval(), shutdown).await;
    })
}
