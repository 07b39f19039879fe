use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use botfleet_core::types::{DEFAULT_QUERY_INTERVAL_SECS, DEFAULT_QUERY_TIMEOUT_MS};
use botfleet_store::models::{list_servers, update_server_query_result, ServerRow};

use crate::error::{QuerierError, Result};
use crate::wire::{build_info_packet, parse_info_reply};

fn resolve_ipv4(host: &str, port: u16) -> Result<Ipv4Addr> {
    (host, port)
        .to_socket_addrs()?
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| QuerierError::ResolveFailed { host: host.to_string() })
}

/// Runs one round-trip `info` query against `server`, returning the parsed
/// reply and measured ping in milliseconds.
pub async fn query_server_info(
    server: &ServerRow,
    timeout: Duration,
) -> Result<(crate::wire::InfoReply, u32)> {
    let ip = resolve_ipv4(&server.host, server.port)?;
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect((ip, server.port)).await?;

    let packet = build_info_packet(ip, server.port);
    let start = std::time::Instant::now();
    socket.send(&packet).await?;

    let mut buf = [0u8; 2048];
    let len = tokio::time::timeout(timeout, socket.recv(&mut buf))
        .await
        .map_err(|_| QuerierError::Timeout)??;
    let ping = start.elapsed().as_millis() as u32;

    let reply = parse_info_reply(&buf[..len]).ok_or(QuerierError::MalformedReply)?;
    Ok((reply, ping))
}

/// One full querier cycle: reads every known server, queries each in turn,
/// and persists successes. Failures are logged and simply leave the row
/// unchanged — the next cycle retries.
pub async fn run_query_cycle(conn: &Arc<Mutex<Connection>>, timeout: Duration) {
    let servers = {
        let guard = conn.lock().await;
        match list_servers(&guard) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "failed to read servers table");
                return;
            }
        }
    };

    for server in &servers {
        match query_server_info(server, timeout).await {
            Ok((reply, ping)) => {
                let guard = conn.lock().await;
                if let Err(e) = update_server_query_result(
                    &guard,
                    server.id,
                    &reply.hostname,
                    &reply.gamemode,
                    &reply.language,
                    reply.players,
                    reply.max_players,
                    ping,
                ) {
                    warn!(error = %e, server = %server.id, "failed to persist query result");
                } else {
                    debug!(server = %server.id, ping, "server query updated");
                }
            }
            Err(e) => {
                info!(server = %server.id, host = %server.host, error = %e, "server query failed (offline)");
            }
        }
    }
}

/// Background loop running [`run_query_cycle`] every `interval` until
/// `shutdown` resolves.
pub async fn run(
    conn: Arc<Mutex<Connection>>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let timeout = Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS);
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_query_cycle(&conn, timeout).await;
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

pub fn default_interval() -> Duration {
    Duration::from_secs(DEFAULT_QUERY_INTERVAL_SECS)
}
