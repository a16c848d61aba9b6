//! Envelope Codec Errors
//!
//! Failures raised while turning envelopes into frames and back. Both the
//! router and the client transport surface these; the router maps an
//! `EnvelopeError` to a protocol error, the client wraps either variant in
//! `ClientError::Serialization`.
//!
//! ```rust
//! use deck_engine::shared::{Envelope, SharedError};
//!
//! let err = Envelope::parse("[1, 2]").unwrap_err();
//! assert!(matches!(err, SharedError::EnvelopeError { .. }));
//! ```
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// A payload could not be encoded or decoded
    #[error("Serialization error: {message}")]
    SerializationError { message: String },

    /// An inbound frame is not an envelope
    #[error("Envelope error: {message}")]
    EnvelopeError { message: String },
}

impl SharedError {
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    pub fn envelope(message: impl Into<String>) -> Self {
        Self::EnvelopeError {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
