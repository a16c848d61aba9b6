/**
 * Socket Route Handlers
 *
 * - `GET /deck_endpoint/` and `GET /api/` - WebSocket upgrade into the RPC
 *   protocol; accepts `?session=<uuid>` and `?adminpanel=1`
 * - `GET /ping` - liveness check for monitoring, answers `Pong!`
 *
 * The client address is the first `X-Forwarded-For` entry when present,
 * otherwise the peer address of the TCP connection.
 */

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, Query, State},
    http::{header::USER_AGENT, Extensions, HeaderMap},
    response::Response,
};
use futures_util::FutureExt;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::backend::protocol::{client_ip, ConnectParams, RequestContext, Router as RpcRouter};

pub async fn ping() -> &'static str {
    "Pong!"
}

/// Upgrade the request and hand the socket to the RPC router.
pub async fn upgrade_connection(
    ws: WebSocketUpgrade,
    State(router): State<Arc<RpcRouter>>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    extensions: Extensions,
) -> Response {
    let remote = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip_address = client_ip(&headers, remote);
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    tracing::info!(
        remote_addr = %ip_address,
        user_agent = %user_agent,
        session = params.session.as_deref().unwrap_or_default(),
        "client connected"
    );

    let ctx = RequestContext::connection(ip_address, user_agent);
    ws.on_upgrade(move |socket| async move {
        let outcome = AssertUnwindSafe(router.serve_socket(socket, ctx, params))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            tracing::error!("connection handler panicked");
        }
    })
}
