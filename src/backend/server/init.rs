/**
 * Engine Initialization
 *
 * Builds the engine from configuration and runs it.
 *
 * # Build
 *
 * 1. **Validate**: the configuration is checked before anything starts
 * 2. **Store**: the supplied store, or an in-memory one
 * 3. **Fan-out**: when enabled, open the bus and subscribe to both topics
 * 4. **Router**: register the RPC table, then any extra endpoints
 *
 * # Open / Close
 *
 * `open` binds the listener and serves in the background. `close` cancels
 * every read loop, stops accepting, and waits for the server and in-flight
 * request tasks up to `server.shutdown_timeout_secs`.
 */

use axum::routing::MethodRouter;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::backend::error::BackendError;
use crate::backend::protocol::{ConnectionRegistry, Endpoint, Router};
use crate::backend::push::{open_bus, FanOut, Pusher};
use crate::backend::routes::router::create_router;
use crate::backend::server::service::{register_rpcs, RpcService, UnimplementedService};
use crate::backend::server::state::AppState;
use crate::backend::store::{MemoryStore, Store};
use crate::shared::EngineConfig;

/// Builder returned by [`Engine::builder`]
pub struct EngineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn Store>>,
    service: Arc<dyn RpcService>,
    endpoints: Vec<(String, Endpoint)>,
    graphql: Option<MethodRouter>,
    registry: Arc<ConnectionRegistry>,
}

impl EngineBuilder {
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn service(mut self, service: Arc<dyn RpcService>) -> Self {
        self.service = service;
        self
    }

    /// Register an extra endpoint. It replaces a table entry with the same
    /// name.
    pub fn endpoint(mut self, rpc: &str, endpoint: Endpoint) -> Self {
        self.endpoints.push((rpc.to_string(), endpoint));
        self
    }

    /// Handler mounted at `/graphql` behind the admin check
    pub fn graphql(mut self, handler: MethodRouter) -> Self {
        self.graphql = Some(handler);
        self
    }

    /// Registry the engine will use, for building endpoints that need it
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Build the engine.
    ///
    /// # Errors
    ///
    /// Configuration error for an invalid configuration, bus error when
    /// fan-out is enabled and the bus cannot be reached.
    pub async fn build(self) -> Result<Engine, BackendError> {
        self.config.validate()?;
        let config = Arc::new(self.config);
        tracing::info!(environment = %config.environment, "[Engine] Building engine");

        let store = self.store.unwrap_or_else(|| {
            tracing::warn!("[Engine] No store configured, using in-memory store");
            Arc::new(MemoryStore::new())
        });
        let registry = self.registry;
        let shutdown = CancellationToken::new();
        let tasks = TaskTracker::new();

        let fan_out = if config.push.fan_out {
            let bus = open_bus(&config.push.bus_url).await?;
            let fan_out = FanOut::new(bus, Arc::clone(&registry));
            fan_out.listen(shutdown.clone(), &tasks).await?;
            Some(fan_out)
        } else {
            None
        };
        let pusher = Pusher::new(Arc::clone(&registry), fan_out);

        let mut router = Router::new(Arc::clone(&store), Arc::clone(&registry), config.protocol.clone())
            .with_shutdown(shutdown.clone(), tasks.clone());
        register_rpcs(
            &mut router,
            &registry,
            &self.service,
            config.protocol.unauthenticated_rate_limit,
        );
        for (rpc, endpoint) in self.endpoints {
            router.register_rpc(&rpc, endpoint);
        }

        let state = AppState {
            router: Arc::new(router),
            store,
            registry,
            pusher,
            config: Arc::clone(&config),
        };

        Ok(Engine {
            config,
            state,
            graphql: self.graphql,
            shutdown,
            tasks,
            server: None,
        })
    }
}

/// The running transport: HTTP surface, router, registry and pusher
pub struct Engine {
    config: Arc<EngineConfig>,
    state: AppState,
    graphql: Option<MethodRouter>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
    server: Option<JoinHandle<()>>,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            store: None,
            service: Arc::new(UnimplementedService),
            endpoints: Vec::new(),
            graphql: None,
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pusher(&self) -> &Pusher {
        &self.state.pusher
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.state.router
    }

    /// The axum application, without a listener
    pub fn app(&self) -> axum::Router {
        create_router(self.state.clone(), self.graphql.clone())
    }

    /// Bind the configured address and serve in the background.
    ///
    /// # Returns
    ///
    /// The bound address (useful with port 0)
    pub async fn open(&mut self) -> Result<SocketAddr, BackendError> {
        let server = &self.config.server;
        let listener = TcpListener::bind((server.host.as_str(), server.port)).await?;
        let addr = listener.local_addr()?;
        tracing::info!(host = %server.host, port = server.port, address = %addr, "starting rpc service");

        let app = self.app();
        let shutdown = self.shutdown.clone();
        self.server = Some(tokio::spawn(async move {
            let serve = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            match serve.await {
                Ok(()) => tracing::info!("rpc http server gracefully stopped"),
                Err(err) => tracing::error!(error = %err, "rpc http server failed"),
            }
        }));
        Ok(addr)
    }

    /// Shut down, waiting at most the configured shutdown timeout.
    pub async fn close(&mut self) {
        tracing::info!("shutting down rpc server");
        self.shutdown.cancel();
        self.tasks.close();

        let server = self.server.take();
        let tasks = self.tasks.clone();
        let drain = async move {
            if let Some(server) = server {
                if let Err(err) = server.await {
                    tracing::error!(error = %err, "server task failed");
                }
            }
            tasks.wait().await;
        };
        if tokio::time::timeout(self.config.server.shutdown_timeout(), drain).await.is_err() {
            tracing::warn!(
                live_connections = self.state.registry.count(),
                "shutdown deadline elapsed, abandoning in-flight requests"
            );
        }
    }
}
