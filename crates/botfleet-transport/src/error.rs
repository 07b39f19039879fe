use thiserror::Error;

/// Errors a transport adapter can raise from `connect`/`send`/`disconnect`.
/// Delivered events (`TransportEvent::Disconnected`) carry protocol faults
/// instead — this enum is for adapter-level failures (socket setup, etc).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("transport not connected")]
    NotConnected,
}
