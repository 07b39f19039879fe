pub mod error;
pub mod transport;
pub mod types;

pub use error::TransportError;
pub use transport::{MockTransport, Transport};
pub use types::{DisconnectReason, SendReliability, SyncKind, TransportEvent};
