/**
 * HTTP Middleware
 *
 * - `access_control` adds permissive CORS headers to every response and
 *   answers preflight `OPTIONS` requests itself
 * - `require_admin_http` guards admin routes. The `Authorization` header
 *   carries a bare session id (no `Bearer` scheme); the session's user must
 *   be an admin. Every failure is a 401.
 */

use axum::{
    extract::{Request, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION,
        },
        HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::store::Store;
use crate::shared::User;

/// Admin user resolved by [`require_admin_http`], stored in request extensions
#[derive(Clone, Debug)]
pub struct AdminUser(pub User);

pub async fn access_control(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Origin, Content-Type, Authorization"),
    );
    response
}

/// Admit only requests whose `Authorization` header names an admin session.
///
/// # Errors
///
/// An auth error (401 with a JSON body) for a missing or malformed token,
/// an unknown session, a non-admin user or a failed store lookup.
pub async fn require_admin_http(
    State(store): State<Arc<dyn Store>>,
    mut request: Request,
    next: Next,
) -> Result<Response, BackendError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("[Admin] Missing Authorization header");
            BackendError::unauthenticated()
        })?;

    let session_id = Uuid::parse_str(token.trim()).map_err(|_| {
        tracing::warn!("[Admin] Authorization header is not a session id");
        BackendError::unauthenticated()
    })?;

    let session = store
        .get_session(session_id)
        .await
        .map_err(|e| {
            tracing::error!("[Admin] Session lookup failed: {}", e);
            BackendError::unauthenticated()
        })?
        .ok_or_else(BackendError::unauthenticated)?;

    let user = store
        .get_user(session.user_id)
        .await
        .map_err(|e| {
            tracing::error!("[Admin] User lookup failed: {}", e);
            BackendError::unauthenticated()
        })?
        .filter(|user| user.admin)
        .ok_or_else(|| {
            tracing::warn!(session_id = %session_id, "[Admin] Non-admin session rejected");
            BackendError::unauthenticated()
        })?;

    request.extensions_mut().insert(AdminUser(user));
    Ok(next.run(request).await)
}
