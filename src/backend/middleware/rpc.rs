/**
 * RPC Middleware
 *
 * Guards and side effects wrapped around endpoints. Each function takes an
 * endpoint and returns a new one, so guards nest:
 *
 * ```rust
 * use deck_engine::backend::middleware::rpc::{deauthenticate, require_user};
 * # use deck_engine::backend::protocol::{endpoint, ConnectionRegistry, Reply};
 * # use std::sync::Arc;
 * # let registry = Arc::new(ConnectionRegistry::new());
 * let logout = endpoint(|_| async { Ok(Reply::empty()) });
 * let guarded = deauthenticate(registry, require_user(logout));
 * ```
 *
 * Guard failures are ordinary endpoint errors: the router answers them with
 * an error frame and the connection stays open.
 */

use futures_util::FutureExt;
use governor::DefaultDirectRateLimiter;
use std::sync::Arc;

use crate::backend::error::BackendError;
use crate::backend::protocol::endpoint::{Endpoint, RpcRequest};
use crate::backend::protocol::registry::ConnectionRegistry;
use crate::shared::User;

fn session_user(request: &RpcRequest) -> Result<User, BackendError> {
    request
        .session
        .as_ref()
        .and_then(|session| session.user())
        .cloned()
        .ok_or_else(BackendError::unauthenticated)
}

/// Reject requests whose connection has no session with a loaded user.
///
/// The user id and username are copied into the request context.
pub fn require_user(next: Endpoint) -> Endpoint {
    Arc::new(move |mut request: RpcRequest| {
        let next = Arc::clone(&next);
        async move {
            let user = session_user(&request)?;
            request.ctx.user_id = Some(user.id);
            request.ctx.username = Some(user.username);
            next(request).await
        }
        .boxed()
    })
}

/// [`require_user`], and the user must be an admin.
pub fn require_admin(next: Endpoint) -> Endpoint {
    Arc::new(move |mut request: RpcRequest| {
        let next = Arc::clone(&next);
        async move {
            let user = session_user(&request)?;
            if !user.admin {
                tracing::warn!(username = %user.username, rpc = %request.message.rpc, "admin rpc denied");
                return Err(BackendError::permission_denied());
            }
            request.ctx.user_id = Some(user.id);
            request.ctx.username = Some(user.username);
            next(request).await
        }
        .boxed()
    })
}

/// Bind the session returned by a successful login-like endpoint to the
/// calling connection.
///
/// The binding happens before the router writes the response, so the
/// client's next request is already authenticated.
pub fn authenticate(registry: Arc<ConnectionRegistry>, next: Endpoint) -> Endpoint {
    Arc::new(move |request: RpcRequest| {
        let next = Arc::clone(&next);
        let registry = Arc::clone(&registry);
        async move {
            let writer = request.writer.clone();
            let reply = next(request).await?;
            if let Some(session) = &reply.session {
                registry.authenticate(&writer, Arc::clone(session));
            }
            Ok(reply)
        }
        .boxed()
    })
}

/// Drop the connection's session after a successful logout.
pub fn deauthenticate(registry: Arc<ConnectionRegistry>, next: Endpoint) -> Endpoint {
    Arc::new(move |request: RpcRequest| {
        let next = Arc::clone(&next);
        let registry = Arc::clone(&registry);
        async move {
            let writer = request.writer.clone();
            let reply = next(request).await?;
            registry.deauthenticate(&writer);
            Ok(reply)
        }
        .boxed()
    })
}

/// Wait for a token from `limiter` before running the endpoint.
///
/// The limiter is shared by every endpoint wrapped with it.
pub fn rate_limit(limiter: Arc<DefaultDirectRateLimiter>, next: Endpoint) -> Endpoint {
    Arc::new(move |request: RpcRequest| {
        let next = Arc::clone(&next);
        let limiter = Arc::clone(&limiter);
        async move {
            limiter.until_ready().await;
            next(request).await
        }
        .boxed()
    })
}
