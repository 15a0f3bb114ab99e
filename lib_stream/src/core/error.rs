use thiserror::Error;

use crate::core::connection::ConnectionState;
use crate::core::transport::TransportError;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Connection is {0}, not ready")]
    NotReady(ConnectionState),

    #[error("Outbound channel closed")]
    ChannelClosed,

    #[error("Stream client is already running")]
    AlreadyRunning,

    #[error("Gave up after {attempts} reconnect attempts")]
    RetriesExhausted { attempts: u32 },
}
