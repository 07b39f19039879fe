use serde::{Deserialize, Serialize};
use std::fmt;

/// A 3D world-space vector. Used for position, velocity, and rotation alike.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn scale(&self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn length_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        self.sub(other).length()
    }

    pub fn distance_squared(&self, other: &Vec3) -> f32 {
        self.sub(other).length_squared()
    }

    /// Unit vector pointing from this point toward `other`. Returns `ZERO` if coincident.
    pub fn normalize(&self) -> Vec3 {
        let len = self.length();
        if len < f32::EPSILON {
            Vec3::ZERO
        } else {
            self.scale(1.0 / len)
        }
    }

    /// Round both planar components to two decimal places, matching tool output.
    pub fn rounded(&self) -> Vec3 {
        Vec3::new(round2(self.x), round2(self.y), round2(self.z))
    }
}

pub fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

/// `(host, port)` identity of a game server — the natural primary key for
/// everything that is per-destination: shared world resources, admission
/// grouping, and persisted `servers` rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Bot connection lifecycle state (C4). Any error-kind event resets a bot
/// straight back to `Disconnected` from whichever state it was in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    Disconnected,
    Connecting,
    WaitForJoin,
    Connected,
    Spawned,
}

/// Reliability mode requested for an outbound transport send — mirrors the
/// RakNet-style channel semantics the game protocol assumes underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reliability {
    Unreliable,
    UnreliableSequenced,
    Reliable,
    ReliableOrdered,
}

/// Neighborhood listing radius used by every `list_*` situational-awareness tool.
pub const STREAM_RANGE: f32 = 300.0;
/// Max straight-line span a `goto` path request is allowed to span.
pub const MAX_PATH_SPAN: f32 = 150.0;
/// Interaction range for `send_pickup`.
pub const PICKUP_RANGE: f32 = 3.0;
/// Admission delay after a bot drops to Disconnected before it may retry.
pub const RECONNECT_DELAY_MS: u64 = 4_000;
/// Time since death before a bot auto-respawns.
pub const RESPAWN_DELAY_MS: u64 = 4_000;
/// Synthetic on-foot state sync cadence.
pub const SYNC_INTERVAL_MS: u64 = 40;
/// Tick loop period.
pub const TICK_PERIOD_MS: u64 = 1;
/// Default per-action cooldown enforced by the function dispatcher.
pub const DEFAULT_ACTION_COOLDOWN_SECS: u64 = 2;
/// Default cooldown on the session's own autonomous-update action.
pub const DEFAULT_LLM_UPDATE_COOLDOWN_SECS: u64 = 10;
/// Default idle timeout before an LLM session is garbage-collected.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30 * 60;
/// Default session-worker wake interval.
pub const DEFAULT_SESSION_UPDATE_INTERVAL_SECS: u64 = 5;
/// Default server-query worker interval.
pub const DEFAULT_QUERY_INTERVAL_SECS: u64 = 30;
/// Default per-server query timeout.
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
/// Max entries kept in a bot's FIFO chatbox buffer.
pub const MAX_CHATBOX_SIZE: usize = 64;
/// Max conversation turns kept in an LLM session's history deque.
pub const MAX_CONVERSATION_HISTORY: usize = 20;
/// Max live player/vehicle entries per shared server resource pool.
pub const MAX_PLAYERS: usize = 2000;
pub const MAX_VEHICLES: usize = 2000;
/// Max live entries per per-bot streamable pool.
pub const MAX_PICKUPS: usize = 4096;
pub const MAX_OBJECTS: usize = 1000;
pub const MAX_LABELS: usize = 1024;
/// Spatial-hash cell size (world units) used to bucket 3D text labels.
pub const LABEL_GRID_CELL_SIZE: f32 = 2.0;
/// `list_objects` is capped at this many nearest results.
pub const MAX_LISTED_OBJECTS: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_matches_pythagoras() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 0.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn normalize_of_zero_is_zero() {
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
    }

    #[test]
    fn server_address_displays_host_colon_port() {
        let addr = ServerAddress::new("play.example.com", 7777);
        assert_eq!(addr.to_string(), "play.example.com:7777");
    }
}
