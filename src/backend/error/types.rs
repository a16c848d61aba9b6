/**
 * Backend Error Types
 *
 * This module defines the error type shared by every backend component.
 * Each variant corresponds to one error kind a client can observe.
 *
 * # Client-visible Effects
 *
 * ## Protocol, Auth, Handler
 *
 * Encoded as an error frame answering the request (`ack` = requestID).
 * The connection stays open.
 *
 * ## Session
 *
 * An unknown session on connect results in an unsolicited `logout` frame.
 * A session id that cannot be parsed aborts the connection.
 *
 * ## Maintenance
 *
 * An unsolicited `maintainanceMode` frame followed by a close.
 *
 * ## Transport, Store, Bus
 *
 * Logged on the server. Store errors raised inside a handler are still
 * encoded for the client.
 */

use axum::http::StatusCode;
use thiserror::Error;

use crate::shared::{ConfigError, SharedError};

/// Coarse classification of a [`BackendError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Protocol,
    Auth,
    Session,
    Maintenance,
    Handler,
    Transport,
    Store,
    Bus,
    Serialization,
    Config,
}

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use deck_engine::backend::error::{BackendError, ErrorKind};
///
/// let err = BackendError::unauthenticated();
/// assert_eq!(err.kind(), ErrorKind::Auth);
/// assert_eq!(err.message(), "unauthenticated request");
///
/// let err = BackendError::handler("card not found");
/// assert_eq!(err.message(), "card not found");
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Malformed envelope, missing context values or unknown RPC
    #[error("Protocol error: {message}")]
    ProtocolError {
        /// Human-readable error message
        message: String,
    },

    /// The request lacks the required identity or privileges
    #[error("Auth error: {message}")]
    AuthError {
        /// Human-readable error message
        message: String,
    },

    /// Session presented on connect could not be used
    #[error("Session error: {message}")]
    SessionError {
        /// Human-readable error message
        message: String,
    },

    /// Connection closed by the maintenance gate
    #[error("Maintenance mode is enabled")]
    MaintenanceError,

    /// Domain error returned by an endpoint
    ///
    /// The message is passed to the client verbatim.
    #[error("Handler error: {message}")]
    HandlerError {
        /// Human-readable error message
        message: String,
    },

    /// Socket or framing failure
    #[error("Transport error: {message}")]
    TransportError {
        /// Human-readable error message
        message: String,
    },

    /// Store failure
    #[error("Store error: {message}")]
    StoreError {
        /// Human-readable error message
        message: String,
    },

    /// Pub/sub bus failure
    #[error("Bus error: {message}")]
    BusError {
        /// Human-readable error message
        message: String,
    },

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}

impl BackendError {
    /// Create a new protocol error
    ///
    /// # Arguments
    ///
    /// * `message` - Error message
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    /// Error for an RPC name that has no registered endpoint
    ///
    /// # Arguments
    ///
    /// * `rpc` - RPC name as received, in its original casing
    pub fn rpc_not_found(rpc: &str) -> Self {
        Self::protocol(format!("RPC {} not found", rpc))
    }

    /// Create a new auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    /// Error for a request without an authenticated user
    pub fn unauthenticated() -> Self {
        Self::auth("unauthenticated request")
    }

    /// Error for a non-admin calling an admin endpoint
    pub fn permission_denied() -> Self {
        Self::auth("permission denied")
    }

    /// Create a new session error
    pub fn session(message: impl Into<String>) -> Self {
        Self::SessionError {
            message: message.into(),
        }
    }

    /// Create a new handler error
    ///
    /// # Arguments
    ///
    /// * `message` - Error message shown to the client as is
    pub fn handler(message: impl Into<String>) -> Self {
        Self::HandlerError {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportError {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreError {
            message: message.into(),
        }
    }

    /// Create a new bus error
    pub fn bus(message: impl Into<String>) -> Self {
        Self::BusError {
            message: message.into(),
        }
    }

    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProtocolError { .. } => ErrorKind::Protocol,
            Self::AuthError { .. } => ErrorKind::Auth,
            Self::SessionError { .. } => ErrorKind::Session,
            Self::MaintenanceError => ErrorKind::Maintenance,
            Self::HandlerError { .. } => ErrorKind::Handler,
            Self::TransportError { .. } => ErrorKind::Transport,
            Self::StoreError { .. } => ErrorKind::Store,
            Self::BusError { .. } => ErrorKind::Bus,
            Self::SharedError(SharedError::EnvelopeError { .. }) => ErrorKind::Protocol,
            Self::SharedError(_) | Self::SerializationError(_) => ErrorKind::Serialization,
            Self::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `Auth` - 401 Unauthorized
    /// - `Protocol`, `Session` - 400 Bad Request
    /// - `Maintenance` - 503 Service Unavailable
    /// - everything else - 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
            ErrorKind::Protocol | ErrorKind::Session => StatusCode::BAD_REQUEST,
            ErrorKind::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Handler
            | ErrorKind::Transport
            | ErrorKind::Store
            | ErrorKind::Bus
            | ErrorKind::Serialization
            | ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    ///
    /// # Returns
    ///
    /// The text placed in the envelope `error` field
    pub fn message(&self) -> String {
        match self {
            Self::ProtocolError { message }
            | Self::AuthError { message }
            | Self::SessionError { message }
            | Self::HandlerError { message }
            | Self::TransportError { message }
            | Self::StoreError { message }
            | Self::BusError { message } => message.clone(),
            Self::MaintenanceError => "maintenance mode".to_string(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
            Self::ConfigError(err) => err.to_string(),
        }
    }
}
