/**
 * Endpoints and Middleware
 *
 * An endpoint is the handler registered under one RPC name. Every endpoint
 * has the same shape: it takes an [`RpcRequest`] and resolves to a
 * [`Reply`] or a [`BackendError`]. The router encodes whichever comes back.
 *
 * A middleware turns an endpoint into another endpoint. Middlewares compose
 * outside-in: `deauthenticate(require_user(logout))` checks the user first
 * and drops the session only after `logout` succeeded.
 *
 * # Example
 *
 * ```rust
 * use deck_engine::backend::protocol::endpoint::{endpoint, Reply};
 *
 * let ping = endpoint(|_request| async { Reply::new("Pong!") });
 * ```
 */

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::backend::error::BackendError;
use crate::backend::protocol::context::RequestContext;
use crate::backend::protocol::push_writer::PushWriter;
use crate::shared::{Envelope, Session};

/// Everything an endpoint gets to see about one request
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub ctx: RequestContext,
    /// Session of the writer at dispatch time
    pub session: Option<Arc<Session>>,
    pub writer: PushWriter,
    pub message: Envelope,
}

impl RpcRequest {
    /// Deserialize the request payload.
    pub fn params<T: serde::de::DeserializeOwned>(&self) -> Result<T, BackendError> {
        Ok(self.message.decode_payload()?)
    }
}

/// Successful endpoint outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Response payload
    pub data: Value,
    /// Session produced by a login-like endpoint, bound by the authenticate middleware
    pub session: Option<Arc<Session>>,
}

impl Reply {
    /// Reply carrying `data`.
    pub fn new<T: Serialize>(data: T) -> Result<Self, BackendError> {
        Ok(Self {
            data: serde_json::to_value(data)?,
            session: None,
        })
    }

    /// Reply with a `null` payload
    pub fn empty() -> Self {
        Self {
            data: Value::Null,
            session: None,
        }
    }

    /// Attach a session for the authenticate middleware to bind.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(Arc::new(session));
        self
    }
}

/// Future returned by an endpoint
pub type EndpointFuture = BoxFuture<'static, Result<Reply, BackendError>>;

/// A registered RPC handler
pub type Endpoint = Arc<dyn Fn(RpcRequest) -> EndpointFuture + Send + Sync>;

/// Build an [`Endpoint`] from an async closure.
pub fn endpoint<F, Fut>(handler: F) -> Endpoint
where
    F: Fn(RpcRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, BackendError>> + Send + 'static,
{
    Arc::new(move |request| handler(request).boxed())
}
