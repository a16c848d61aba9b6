/**
 * Router Configuration
 *
 * Combines every HTTP route into one axum router.
 *
 * # Routes
 *
 * - `GET /ping` - liveness check
 * - `GET /deck_endpoint/`, `GET /api/` - WebSocket upgrade
 * - `/graphql` - admin handler behind `Authorization: <session id>`
 * - `GET /<public_path>/...` - static files
 *
 * The CORS middleware wraps every route, so preflight requests are
 * answered before any authentication runs.
 */

use axum::{
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{any, get, MethodRouter},
    Router,
};
use tower_http::services::ServeDir;

use crate::backend::middleware::http::{access_control, require_admin_http};
use crate::backend::routes::socket_routes::{ping, upgrade_connection};
use crate::backend::server::state::AppState;

async fn graphql_unavailable() -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

/// Create the axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Shared state for the handlers
/// * `graphql` - Admin handler for `/graphql`; answers 501 when absent
pub fn create_router(app_state: AppState, graphql: Option<MethodRouter>) -> Router<()> {
    let graphql: MethodRouter = graphql
        .unwrap_or_else(|| any(graphql_unavailable))
        .layer(from_fn_with_state(app_state.store.clone(), require_admin_http));

    let public_dir = app_state.config.server.public_path.clone();
    let public_prefix = format!("/{}", public_dir.trim_matches('/'));
    let static_files = ServeDir::new(&public_dir);

    Router::new()
        .route("/ping", get(ping))
        .route("/deck_endpoint/", get(upgrade_connection))
        .route("/api/", get(upgrade_connection))
        .route_service("/graphql", graphql)
        .nest_service(&public_prefix, static_files)
        .layer(from_fn(access_control))
        .with_state(app_state)
}
