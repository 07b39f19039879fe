use async_trait::async_trait;
use botfleet_core::types::Vec3;

use crate::error::TransportError;
use crate::types::{SendReliability, TransportEvent};

/// Pluggable adapter for the underlying reliable-UDP game protocol. The
/// spec treats this as an oracle: it assumes RPC multiplexing and
/// per-channel reliability modes but does not constrain the wire layout,
/// so implementations are free to speak whatever dialect the target game
/// server expects.
///
/// `connect` is non-blocking — it kicks off the handshake and the bot state
/// machine (C4) advances purely by draining events off `poll_event`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&mut self, host: &str, port: u16) -> Result<(), TransportError>;

    async fn disconnect(&mut self) -> Result<(), TransportError>;

    async fn send(
        &self,
        channel: u8,
        bytes: &[u8],
        reliability: SendReliability,
        priority: u8,
    ) -> Result<(), TransportError>;

    /// Non-blocking pop of the next inbound event, if any are queued.
    fn poll_event(&mut self) -> Option<TransportEvent>;

    /// Collision/visibility query against the embedded native physics
    /// library: `None` means the segment is unobstructed, `Some(point)`
    /// gives the first hit. Treated as an external oracle — no byte layout
    /// is specified.
    fn raycast(&self, from: Vec3, to: Vec3) -> Option<Vec3>;
}

/// A transport with no backing socket — queues events fed in by tests and
/// discards outbound sends. Used to drive the bot state machine (C4) in
/// isolation from a real game server.
#[derive(Default)]
pub struct MockTransport {
    inbox: std::collections::VecDeque<TransportEvent>,
    pub sent: Vec<Vec<u8>>,
    pub connected: bool,
    pub raycast_block: Option<Vec3>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_event(&mut self, event: TransportEvent) {
        self.inbox.push_back(event);
    }

    pub fn block_raycast_at(&mut self, point: Vec3) {
        self.raycast_block = Some(point);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self, _host: &str, _port: u16) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        Ok(())
    }

    async fn send(
        &self,
        _channel: u8,
        _bytes: &[u8],
        _reliability: SendReliability,
        _priority: u8,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.inbox.pop_front()
    }

    fn raycast(&self, _from: Vec3, _to: Vec3) -> Option<Vec3> {
        // Unobstructed by default; tests override via `MockTransport::blocked_at`.
        self.raycast_block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DisconnectReason};

    #[tokio::test]
    async fn mock_transport_delivers_queued_events_in_order() {
        let mut t = MockTransport::new();
        t.push_event(TransportEvent::Accepted {
            player_id: 1,
            challenge: vec![],
        });
        t.push_event(TransportEvent::Disconnected {
            reason: DisconnectReason::ConnectionLost,
        });

        assert!(matches!(t.poll_event(), Some(TransportEvent::Accepted { .. })));
        assert!(matches!(
            t.poll_event(),
            Some(TransportEvent::Disconnected { .. })
        ));
        assert!(t.poll_event().is_none());
    }
}
