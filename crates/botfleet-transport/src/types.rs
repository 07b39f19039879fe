use botfleet_core::types::Reliability;
use serde::{Deserialize, Serialize};

pub use Reliability as SendReliability;

/// Synchronization payload kind carried by a `Sync` inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Player,
    Vehicle,
    Passenger,
    Trailer,
    Unoccupied,
    Bullet,
    Aim,
}

/// Reason a connection was lost or refused — drives the error-handling
/// taxonomy's "protocol fault" bucket (reset to Disconnected, 4s delay).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    ConnectionLost,
    ConnectionBanned,
    AttemptFailed,
    ServerFull,
    InvalidPassword,
    Disconnection,
}

/// A single event delivered by the transport's inbound pump.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Accepted {
        player_id: u16,
        challenge: Vec<u8>,
    },
    AuthChallenge {
        salt: Vec<u8>,
    },
    Rpc {
        id: u8,
        payload: Vec<u8>,
    },
    Sync {
        kind: SyncKind,
        payload: Vec<u8>,
    },
    Disconnected {
        reason: DisconnectReason,
    },
}
