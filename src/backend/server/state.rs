/**
 * Application State
 *
 * Shared by every HTTP handler. Everything inside is an `Arc`, so cloning the
 * state per request is cheap.
 *
 * The `FromRef` implementations let handlers extract only the part they
 * need:
 *
 * ```rust
 * use axum::extract::State;
 * use std::sync::Arc;
 * use deck_engine::backend::protocol::Router;
 *
 * async fn handler(State(router): State<Arc<Router>>) {
 *     let live = router.registry().count();
 * #   let _ = live;
 * }
 * ```
 */

use axum::extract::FromRef;
use std::sync::Arc;

use crate::backend::protocol::{ConnectionRegistry, Router};
use crate::backend::push::Pusher;
use crate::backend::store::Store;
use crate::shared::EngineConfig;

/// State handed to the axum router
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub store: Arc<dyn Store>,
    pub registry: Arc<ConnectionRegistry>,
    pub pusher: Pusher,
    pub config: Arc<EngineConfig>,
}

impl FromRef<AppState> for Arc<Router> {
    fn from_ref(state: &AppState) -> Self {
        state.router.clone()
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<ConnectionRegistry> {
    fn from_ref(state: &AppState) -> Self {
        state.registry.clone()
    }
}
