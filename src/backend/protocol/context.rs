/**
 * Request Context
 *
 * Values the router threads through a request: where the connection came
 * from, and the correlation values copied out of the inbound envelope.
 *
 * `None` means the value was never seeded, which is different from an empty
 * string. A request whose envelope has no callback is seeded with
 * `Some("")`; the encoder treats only `None` as a protocol violation.
 */

use uuid::Uuid;

use crate::shared::Envelope;

/// Per-connection and per-request values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub session_id: Option<String>,
    pub callback: Option<String>,
    /// Set by the require-user and require-admin middlewares
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
}

impl RequestContext {
    /// Context for a freshly accepted connection
    pub fn connection(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
            user_agent: Some(user_agent.into()),
            ..Default::default()
        }
    }

    /// Child context seeded with the correlation values of `message`
    pub fn for_message(&self, message: &Envelope) -> Self {
        Self {
            request_id: Some(message.request_id.clone()),
            session_id: Some(message.session_id.clone()),
            callback: Some(message.callback.clone()),
            ..self.clone()
        }
    }

    /// Child context for a frame that could not be parsed
    ///
    /// The error response then carries neither ack nor rpc.
    pub fn for_malformed(&self) -> Self {
        Self {
            request_id: Some(String::new()),
            session_id: Some(String::new()),
            callback: Some(String::new()),
            ..self.clone()
        }
    }
}
