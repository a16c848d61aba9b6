/**
 * Envelope Codec
 *
 * Every logical message on a deck connection (a client request, the server's
 * response to it, or an unsolicited push) travels as one JSON text frame
 * holding an `Envelope`.
 *
 * # Envelope Shapes
 *
 * - **Request**: `rpc` + `requestID`, no `ack`
 * - **Response**: `ack` = requestID being answered, `rpc` = callback of the request,
 *   and exactly one of `data` / `error`
 * - **Push**: `rpc` + `requestID`, no `ack` (server originated)
 *
 * Empty fields are omitted on the wire and unknown fields are ignored when
 * reading, so older clients keep working when fields are added.
 *
 * # Example
 *
 * ```rust
 * use deck_engine::shared::envelope::Envelope;
 *
 * let request = Envelope::request("getCards");
 * assert_eq!(request.rpc, "getcards");
 * assert!(!request.request_id.is_empty());
 * ```
 */
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::shared::error::SharedError;

/// The on-wire JSON object carrying one logical message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// RPC name; compared case-insensitively by the router
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rpc: String,

    /// Session the client believes it holds
    #[serde(rename = "sessionID", default, skip_serializing_if = "String::is_empty")]
    pub session_id: String,

    /// Unique per originator
    #[serde(rename = "requestID", default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,

    /// The requestID this envelope answers
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ack: String,

    /// Opaque payload. `None` when the field is absent; an explicit `null`
    /// is kept as `Some(Value::Null)`.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "present_value")]
    pub data: Option<Value>,

    /// Error text; mutually exclusive with `data` in responses
    #[serde(rename = "error", default, skip_serializing_if = "String::is_empty")]
    pub error: String,

    /// RPC name the response should be delivered under
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback: String,
}

impl Envelope {
    /// Create a request envelope with a fresh request ID.
    ///
    /// The RPC name is lowercased so servers matching exactly still resolve it.
    pub fn request(rpc: &str) -> Self {
        Self {
            rpc: rpc.to_lowercase(),
            request_id: next_id(),
            ..Default::default()
        }
    }

    /// Create a server-originated push envelope with a fresh request ID.
    ///
    /// Push names keep their canonical casing (`newCard`, `maintainanceMode`).
    pub fn push(rpc: &str) -> Self {
        Self {
            rpc: rpc.to_string(),
            request_id: next_id(),
            ..Default::default()
        }
    }

    /// Create a successful response to a request.
    pub fn response(callback: &str, ack: &str, data: Value) -> Self {
        Self {
            rpc: callback.to_string(),
            ack: ack.to_string(),
            data: Some(data),
            ..Default::default()
        }
    }

    /// Create an error response to a request.
    pub fn error_response(callback: &str, ack: &str, error: impl Into<String>) -> Self {
        Self {
            rpc: callback.to_string(),
            ack: ack.to_string(),
            error: error.into(),
            ..Default::default()
        }
    }

    /// Serialize `data` into the payload slot.
    pub fn encode_payload<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<(), SharedError> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(())
    }

    /// Builder form of [`Envelope::encode_payload`].
    pub fn with_payload<T: Serialize + ?Sized>(mut self, data: &T) -> Result<Self, SharedError> {
        self.encode_payload(data)?;
        Ok(self)
    }

    /// Deserialize the payload. A missing payload decodes as JSON `null`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, SharedError> {
        let value = self.data.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }

    /// Render this envelope as one text frame.
    pub fn to_frame(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse one text frame.
    pub fn parse(frame: &str) -> Result<Self, SharedError> {
        serde_json::from_str(frame).map_err(|e| SharedError::envelope(format!("malformed envelope: {}", e)))
    }

    /// Lowercased RPC name used for endpoint lookup.
    pub fn method(&self) -> String {
        self.rpc.to_lowercase()
    }

    /// True for responses (the `ack` field is set).
    pub fn is_response(&self) -> bool {
        !self.ack.is_empty()
    }

    /// True for frames the client did not ask for.
    pub fn is_push(&self) -> bool {
        !self.request_id.is_empty() && self.ack.is_empty()
    }

    /// Error text when this envelope carries one.
    pub fn error_message(&self) -> Option<&str> {
        if self.error.is_empty() {
            None
        } else {
            Some(&self.error)
        }
    }
}

/// Only called when the field is present, so `null` stays `Some(Value::Null)`.
fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Generate a new message identifier (UUIDv4 string).
pub fn next_id() -> String {
    Uuid::new_v4().to_string()
}
