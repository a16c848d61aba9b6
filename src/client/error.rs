/**
 * Client Error Types
 */

use thiserror::Error;

use crate::shared::{ConfigError, SharedError};

/// Errors surfaced by [`super::Client`]
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response arrived within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The connection closed while the request was pending
    #[error("connection lost")]
    ConnectionLost,

    /// The server answered with an error frame; carries its text
    #[error("{0}")]
    Remote(String),

    /// WebSocket failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Envelope or payload could not be encoded or decoded
    #[error(transparent)]
    Serialization(#[from] SharedError),

    /// Invalid client configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
