/**
 * RPC Router
 *
 * Runs one connection from upgrade to close and dispatches every inbound
 * frame to the endpoint registered under its RPC name.
 *
 * # Connection Lifecycle
 *
 * 1. **Register**: the connection gets a writer in the registry
 * 2. **Session**: `?session=<uuid>` binds a stored session; an unknown one
 *    gets a `logout` push and the connection continues anonymously;
 *    `?adminpanel=1` flags the connection
 * 3. **Read loop**: per frame, take a token from the connection's rate
 *    limiter, read the settings, run the maintenance gate if enabled, then
 *    spawn a task that routes the frame
 * 4. **Deregister**: when the socket closes, errors, or the server shuts down
 *
 * # Dispatch
 *
 * RPC names are matched case-insensitively. An unknown name is answered with
 * `RPC <name> not found`. Endpoint errors are answered with an error frame
 * and never end the connection. Requests on one connection run concurrently
 * and may complete out of order.
 */

use axum::extract::ws::{Message, WebSocket};
use axum::http::HeaderMap;
use futures_util::{future, FutureExt, Stream, StreamExt};
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::protocol::context::RequestContext;
use crate::backend::protocol::encoding::encode;
use crate::backend::protocol::endpoint::{Endpoint, RpcRequest};
use crate::backend::protocol::push_writer::{FrameSink, PushWriter, WebSocketSink};
use crate::backend::protocol::registry::ConnectionRegistry;
use crate::backend::store::Store;
use crate::shared::config::ProtocolConfig;
use crate::shared::rpc_names::{self, push};
use crate::shared::{Envelope, Session, Settings};

/// Query parameters accepted on the upgrade URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub adminpanel: Option<String>,
}

#[derive(Serialize)]
struct MaintenanceStatus {
    status: bool,
}

/// Endpoint table plus the connection loop
pub struct Router {
    endpoints: HashMap<String, Endpoint>,
    store: Arc<dyn Store>,
    registry: Arc<ConnectionRegistry>,
    config: ProtocolConfig,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl Router {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<ConnectionRegistry>,
        config: ProtocolConfig,
    ) -> Self {
        Self {
            endpoints: HashMap::new(),
            store,
            registry,
            config,
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Tie read loops to `shutdown` and request tasks to `tasks`.
    pub fn with_shutdown(mut self, shutdown: CancellationToken, tasks: TaskTracker) -> Self {
        self.shutdown = shutdown;
        self.tasks = tasks;
        self
    }

    /// Register `endpoint` under `rpc`. The name is stored lowercased.
    pub fn register_rpc(&mut self, rpc: &str, endpoint: Endpoint) {
        self.endpoints.insert(rpc.to_lowercase(), endpoint);
    }

    pub fn has_rpc(&self, rpc: &str) -> bool {
        self.endpoints.contains_key(&rpc.to_lowercase())
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Serve an upgraded axum WebSocket until it closes.
    pub async fn serve_socket(self: Arc<Self>, socket: WebSocket, ctx: RequestContext, params: ConnectParams) {
        let (sink, stream) = socket.split();
        let inbound = stream
            .take_while(|frame| future::ready(matches!(frame, Ok(msg) if !matches!(msg, Message::Close(_)))))
            .filter_map(|frame| {
                future::ready(match frame {
                    Ok(Message::Text(text)) => Some(text.as_str().to_owned()),
                    _ => None,
                })
            });

        let result = self
            .handle_connection(ctx, Box::new(WebSocketSink::new(sink)), Box::pin(inbound), params)
            .await;
        if let Err(err) = result {
            tracing::error!(error = %err, "connection terminated");
        }
    }

    /// Run one connection: register, bind the session, then read frames
    /// from `inbound` until it ends.
    ///
    /// The writer is deregistered on every exit path.
    pub async fn handle_connection<S>(
        self: &Arc<Self>,
        ctx: RequestContext,
        sink: Box<dyn FrameSink>,
        inbound: S,
        params: ConnectParams,
    ) -> Result<(), BackendError>
    where
        S: Stream<Item = String> + Send + Unpin,
    {
        let writer = self.registry.register(&ctx, sink)?;
        let result = self.read_loop(&ctx, &writer, inbound, &params).await;
        self.registry.deregister(&writer);
        result
    }

    async fn read_loop<S>(
        self: &Arc<Self>,
        ctx: &RequestContext,
        writer: &PushWriter,
        mut inbound: S,
        params: &ConnectParams,
    ) -> Result<(), BackendError>
    where
        S: Stream<Item = String> + Send + Unpin,
    {
        self.handle_session(writer, params).await?;

        let rate = NonZeroU32::new(self.config.connection_rate_limit).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_second(rate));

        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    if let Err(err) = writer.close().await {
                        tracing::debug!(writer_id = %writer.id(), error = %err, "close on shutdown failed");
                    }
                    break;
                }
                frame = inbound.next() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            limiter.until_ready().await;

            let settings = match self.store.get_settings().await {
                Ok(settings) => settings,
                Err(err) => {
                    tracing::error!(error = %err, "failed to read settings");
                    Settings::default()
                }
            };
            if settings.maintenance_mode {
                match self.maintenance_gate(writer, &frame).await {
                    Ok(()) => {}
                    Err(BackendError::MaintenanceError) => break,
                    Err(err) => return Err(err),
                }
            }

            self.spawn_request(ctx.clone(), writer.clone(), frame);
        }
        Ok(())
    }

    async fn handle_session(&self, writer: &PushWriter, params: &ConnectParams) -> Result<(), BackendError> {
        if params.adminpanel.as_deref().is_some_and(|v| !v.is_empty()) {
            writer.connection().set_admin_panel(true);
        }
        let Some(raw) = params.session.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(());
        };
        let id = Uuid::parse_str(raw)
            .map_err(|e| BackendError::session(format!("invalid session id {:?}: {}", raw, e)))?;

        match self.store.get_session(id).await? {
            Some(session) => self.registry.authenticate(writer, Arc::new(session)),
            None => {
                tracing::info!(session_id = %id, "unknown session, logging out client");
                writer.encode(&Envelope::push(push::LOGOUT)).await?;
            }
        }
        Ok(())
    }

    /// Apply the maintenance gate to one inbound frame.
    ///
    /// # Errors
    ///
    /// `MaintenanceError` once the client has been notified and the
    /// connection closed; any other error comes from the store or the socket.
    async fn maintenance_gate(&self, writer: &PushWriter, raw: &str) -> Result<(), BackendError> {
        let message = Envelope::parse(raw).unwrap_or_default();
        if message.method() == rpc_names::LOGIN.to_lowercase() {
            return Ok(());
        }

        if let Some(session) = self.resolve_session(writer, &message).await {
            if self.is_admin(&session).await? {
                return Ok(());
            }
        }

        tracing::info!(writer_id = %writer.id(), rpc = %message.rpc, "maintenance mode, closing connection");
        let notice = Envelope::push(push::MAINTENANCE_MODE).with_payload(&MaintenanceStatus { status: true })?;
        writer.encode(&notice).await?;
        writer.close().await?;
        Err(BackendError::MaintenanceError)
    }

    /// Admin flag of the session's user, read from the store only when the
    /// session was loaded without its user.
    async fn is_admin(&self, session: &Session) -> Result<bool, BackendError> {
        if session.user().is_some() {
            return Ok(session.is_admin());
        }
        Ok(self
            .store
            .get_user(session.user_id)
            .await?
            .is_some_and(|user| user.admin))
    }

    /// The writer's session, else the session named in the envelope.
    async fn resolve_session(&self, writer: &PushWriter, message: &Envelope) -> Option<Arc<Session>> {
        if let Some(session) = writer.session() {
            return Some(session);
        }
        let id = Uuid::parse_str(&message.session_id).ok()?;
        match self.store.get_session(id).await {
            Ok(session) => session.map(Arc::new),
            Err(err) => {
                tracing::debug!(session_id = %id, error = %err, "session lookup failed");
                None
            }
        }
    }

    fn spawn_request(self: &Arc<Self>, ctx: RequestContext, writer: PushWriter, raw: String) {
        let router = Arc::clone(self);
        self.tasks.spawn(async move {
            let outcome = AssertUnwindSafe(router.route(&ctx, &writer, &raw))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::error!(writer_id = %writer.id(), error = %err, "request failed"),
                Err(_) => tracing::error!(writer_id = %writer.id(), "request task panicked"),
            }
        });
    }

    /// Parse `raw`, dispatch it and write the response.
    pub async fn route(&self, ctx: &RequestContext, writer: &PushWriter, raw: &str) -> Result<(), BackendError> {
        let message = match Envelope::parse(raw) {
            Ok(message) => message,
            Err(err) => return encode::<()>(&ctx.for_malformed(), Err(err.into()), writer).await,
        };
        let ctx = ctx.for_message(&message);

        let Some(endpoint) = self.endpoints.get(&message.method()).cloned() else {
            return encode::<()>(&ctx, Err(BackendError::rpc_not_found(&message.rpc)), writer).await;
        };

        let request = RpcRequest {
            ctx: ctx.clone(),
            session: writer.session(),
            writer: writer.clone(),
            message,
        };
        let result = endpoint(request).await.map(|reply| reply.data);
        encode(&ctx, result, writer).await
    }
}

/// Client address: the first `X-Forwarded-For` entry, else the peer IP.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match (forwarded, remote) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::protocol::endpoint::{endpoint, Reply};
    use crate::backend::protocol::push_writer::ChannelSink;
    use crate::backend::store::MemoryStore;
    use crate::shared::User;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    struct Harness {
        router: Arc<Router>,
        store: Arc<MemoryStore>,
    }

    struct Client {
        tx: mpsc::UnboundedSender<String>,
        rx: mpsc::UnboundedReceiver<String>,
        done: tokio::task::JoinHandle<Result<(), BackendError>>,
    }

    impl Client {
        async fn recv(&mut self) -> Option<Envelope> {
            tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
                .await
                .ok()
                .flatten()
                .map(|frame| Envelope::parse(&frame).unwrap())
        }

        fn send(&self, frame: &str) {
            self.tx.send(frame.to_string()).unwrap();
        }
    }

    fn harness(configure: impl FnOnce(&mut Router)) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let mut router = Router::new(
            store.clone(),
            Arc::new(ConnectionRegistry::new()),
            ProtocolConfig::default(),
        );
        router.register_rpc("ping?", endpoint(|_| async { Reply::new("Pong!") }));
        router.register_rpc("fail", endpoint(|_| async { Err(BackendError::handler("boom!")) }));
        router.register_rpc("login", endpoint(|_| async { Reply::new("welcome") }));
        configure(&mut router);
        Harness {
            router: Arc::new(router),
            store,
        }
    }

    fn connect(harness: &Harness, params: ConnectParams) -> Client {
        let (sink, rx) = ChannelSink::new();
        let (tx, inbound) = mpsc::unbounded_channel();
        let router = harness.router.clone();
        let done = tokio::spawn(async move {
            router
                .handle_connection(
                    RequestContext::connection("127.0.0.1", "test"),
                    Box::new(sink),
                    UnboundedReceiverStream::new(inbound),
                    params,
                )
                .await
        });
        Client { tx, rx, done }
    }

    #[tokio::test]
    async fn test_ping_is_case_insensitive() {
        let harness = harness(|_| {});
        let mut client = connect(&harness, ConnectParams::default());
        client.send(r#"{"rpc":"PING?","requestID":"11111111-1111-1111-1111-111111111111"}"#);

        let frame = client.recv().await.unwrap();
        assert_eq!(
            frame.to_frame().unwrap(),
            r#"{"ack":"11111111-1111-1111-1111-111111111111","data":"Pong!"}"#
        );
    }

    #[tokio::test]
    async fn test_unknown_rpc() {
        let harness = harness(|_| {});
        let mut client = connect(&harness, ConnectParams::default());
        client.send(r#"{"rpc":"Unknown","requestID":"22222222-2222-2222-2222-222222222222","callback":"cb"}"#);

        let frame = client.recv().await.unwrap();
        assert_eq!(frame.ack, "22222222-2222-2222-2222-222222222222");
        assert_eq!(frame.rpc, "cb");
        assert_eq!(frame.error, "RPC Unknown not found");
        assert!(frame.data.is_none());
    }

    #[tokio::test]
    async fn test_handler_error_keeps_connection_open() {
        let harness = harness(|_| {});
        let mut client = connect(&harness, ConnectParams::default());
        client.send(r#"{"rpc":"fail","requestID":"a"}"#);
        assert_eq!(client.recv().await.unwrap().error, "boom!");

        client.send(r#"{"rpc":"ping?","requestID":"b"}"#);
        assert_eq!(client.recv().await.unwrap().ack, "b");
    }

    #[tokio::test]
    async fn test_malformed_frame_gets_error_response() {
        let harness = harness(|_| {});
        let mut client = connect(&harness, ConnectParams::default());
        client.send("not json");
        let frame = client.recv().await.unwrap();
        assert!(frame.ack.is_empty());
        assert!(frame.error.contains("malformed envelope"));
    }

    #[tokio::test]
    async fn test_unknown_session_sends_logout() {
        let harness = harness(|_| {});
        let params = ConnectParams {
            session: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        };
        let mut client = connect(&harness, params);

        let frame = client.recv().await.unwrap();
        assert_eq!(frame.rpc, "logout");
        assert!(frame.is_push());

        client.send(r#"{"rpc":"ping?","requestID":"c"}"#);
        assert_eq!(client.recv().await.unwrap().data, Some(serde_json::json!("Pong!")));
        let writers = harness.router.registry().writers();
        assert_eq!(writers.len(), 1);
        assert!(!writers[0].authenticated());
    }

    #[tokio::test]
    async fn test_known_session_authenticates() {
        let harness = harness(|_| {});
        let session = Session::new(User::new("chad"));
        harness.store.insert_session(session.clone()).await;

        let mut client = connect(
            &harness,
            ConnectParams {
                session: Some(session.id.to_string()),
                adminpanel: Some("1".into()),
            },
        );
        client.send(r#"{"rpc":"ping?","requestID":"d"}"#);
        client.recv().await.unwrap();

        let writers = harness.router.registry().writers_by_user(session.user_id);
        assert_eq!(writers.len(), 1);
        assert!(writers[0].connection().admin_panel());
    }

    #[tokio::test]
    async fn test_unparsable_session_aborts() {
        let harness = harness(|_| {});
        let client = connect(
            &harness,
            ConnectParams {
                session: Some("not-a-uuid".into()),
                ..Default::default()
            },
        );
        let result = client.done.await.unwrap();
        assert!(matches!(result, Err(BackendError::SessionError { .. })));
        assert_eq!(harness.router.registry().count(), 0);
    }

    #[tokio::test]
    async fn test_close_deregisters() {
        let harness = harness(|_| {});
        let Client { tx, done, .. } = connect(&harness, ConnectParams::default());
        tokio::task::yield_now().await;
        drop(tx);
        done.await.unwrap().unwrap();
        assert_eq!(harness.router.registry().count(), 0);
    }

    #[tokio::test]
    async fn test_maintenance_closes_non_admin() {
        let harness = harness(|_| {});
        harness.store.set_maintenance_mode(true).await;
        let mut client = connect(&harness, ConnectParams::default());
        client.send(r#"{"rpc":"getCards","requestID":"e"}"#);

        let frame = client.recv().await.unwrap();
        assert_eq!(frame.rpc, "maintainanceMode");
        assert_eq!(frame.data, Some(serde_json::json!({"status": true})));
        assert!(client.rx.recv().await.is_none());
        client.done.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_maintenance_lets_login_through() {
        let harness = harness(|_| {});
        harness.store.set_maintenance_mode(true).await;
        let mut client = connect(&harness, ConnectParams::default());
        client.send(r#"{"rpc":"LOGIN","requestID":"f"}"#);
        assert_eq!(client.recv().await.unwrap().data, Some(serde_json::json!("welcome")));
    }

    #[tokio::test]
    async fn test_maintenance_admin_bypass() {
        let harness = harness(|_| {});
        let session = Session::new(User::admin("root"));
        harness.store.insert_session(session.clone()).await;
        harness.store.set_maintenance_mode(true).await;

        let mut client = connect(
            &harness,
            ConnectParams {
                session: Some(session.id.to_string()),
                ..Default::default()
            },
        );
        client.send(r#"{"rpc":"ping?","requestID":"g"}"#);
        let frame = client.recv().await.unwrap();
        assert_eq!(frame.ack, "g");
        assert_eq!(frame.data, Some(serde_json::json!("Pong!")));
    }

    #[tokio::test]
    async fn test_maintenance_admin_via_envelope_session() {
        let harness = harness(|_| {});
        let session = Session::new(User::admin("root"));
        harness.store.insert_session(session.clone()).await;
        harness.store.set_maintenance_mode(true).await;

        let mut client = connect(&harness, ConnectParams::default());
        client.send(&format!(
            r#"{{"rpc":"ping?","requestID":"h","sessionID":"{}"}}"#,
            session.id
        ));
        assert_eq!(client.recv().await.unwrap().ack, "h");
    }

    /// Counts user lookups on top of a [`MemoryStore`].
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        user_lookups: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Store for CountingStore {
        async fn get_session(&self, id: Uuid) -> Result<Option<Session>, BackendError> {
            self.inner.get_session(id).await
        }

        async fn get_user(&self, id: Uuid) -> Result<Option<User>, BackendError> {
            self.user_lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.get_user(id).await
        }

        async fn get_settings(&self) -> Result<Settings, BackendError> {
            self.inner.get_settings().await
        }
    }

    #[tokio::test]
    async fn test_maintenance_uses_loaded_session_user() {
        let store = Arc::new(CountingStore::default());
        let admin = Session::new(User::admin("root"));
        store.inner.insert_session(admin.clone()).await;
        store.inner.set_maintenance_mode(true).await;
        let mut router = Router::new(store.clone(), Arc::new(ConnectionRegistry::new()), ProtocolConfig::default());
        router.register_rpc("ping?", endpoint(|_| async { Reply::new("Pong!") }));
        let harness = Harness {
            router: Arc::new(router),
            store: Arc::new(MemoryStore::new()),
        };

        let mut client = connect(
            &harness,
            ConnectParams {
                session: Some(admin.id.to_string()),
                ..Default::default()
            },
        );
        client.send(r#"{"rpc":"ping?","requestID":"m"}"#);
        client.send(r#"{"rpc":"ping?","requestID":"n"}"#);
        assert_eq!(client.recv().await.unwrap().data, Some(serde_json::json!("Pong!")));
        assert_eq!(client.recv().await.unwrap().data, Some(serde_json::json!("Pong!")));
        assert_eq!(store.user_lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_maintenance_looks_up_user_for_bare_session() {
        let harness = harness(|_| {});
        let admin = User::admin("root");
        harness.store.insert_user(admin.clone()).await;

        let mut client = connect(&harness, ConnectParams::default());
        client.send(r#"{"rpc":"ping?","requestID":"o"}"#);
        assert_eq!(client.recv().await.unwrap().ack, "o");

        let writer = harness.router.registry().writers().remove(0);
        harness
            .router
            .registry()
            .authenticate(&writer, Arc::new(Session::for_user_id(Uuid::new_v4(), admin.id)));
        harness.store.set_maintenance_mode(true).await;

        client.send(r#"{"rpc":"ping?","requestID":"p"}"#);
        assert_eq!(client.recv().await.unwrap().ack, "p");
    }

    #[tokio::test]
    async fn test_connection_rate_limit_delays_frames() {
        let store = Arc::new(MemoryStore::new());
        let config = ProtocolConfig {
            connection_rate_limit: 1,
            ..Default::default()
        };
        let mut router = Router::new(store.clone(), Arc::new(ConnectionRegistry::new()), config);
        router.register_rpc("ping?", endpoint(|_| async { Reply::new("Pong!") }));
        let harness = Harness {
            router: Arc::new(router),
            store,
        };

        let mut client = connect(&harness, ConnectParams::default());
        let started = std::time::Instant::now();
        client.send(r#"{"rpc":"ping?","requestID":"q"}"#);
        client.send(r#"{"rpc":"ping?","requestID":"r"}"#);

        assert_eq!(client.recv().await.unwrap().ack, "q");
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(client.recv().await.unwrap().ack, "r");
        assert!(started.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_request_sees_session_bound_later() {
        let harness = harness(|router| {
            router.register_rpc(
                "whoami",
                endpoint(|request: RpcRequest| async move {
                    Reply::new(request.session.map(|s| s.user_id))
                }),
            );
        });
        let mut client = connect(&harness, ConnectParams::default());
        client.send(r#"{"rpc":"whoami","requestID":"i"}"#);
        assert_eq!(client.recv().await.unwrap().data, Some(serde_json::Value::Null));

        let writer = harness.router.registry().writers().remove(0);
        let session = Arc::new(Session::new(User::new("chad")));
        harness.router.registry().authenticate(&writer, session.clone());

        client.send(r#"{"rpc":"whoami","requestID":"j"}"#);
        assert_eq!(
            client.recv().await.unwrap().data,
            Some(serde_json::json!(session.user_id))
        );
    }

    #[tokio::test]
    async fn test_panicking_endpoint_is_contained() {
        let harness = harness(|router| {
            router.register_rpc(
                "panic",
                endpoint(|_| async {
                    if true {
                        panic!("endpoint bug");
                    }
                    Reply::new(())
                }),
            );
        });
        let mut client = connect(&harness, ConnectParams::default());
        client.send(r#"{"rpc":"panic","requestID":"k"}"#);
        client.send(r#"{"rpc":"ping?","requestID":"l"}"#);
        assert_eq!(client.recv().await.unwrap().ack, "l");
    }

    #[tokio::test]
    async fn test_shutdown_ends_read_loop() {
        let token = CancellationToken::new();
        let store = Arc::new(MemoryStore::new());
        let router = Arc::new(
            Router::new(store, Arc::new(ConnectionRegistry::new()), ProtocolConfig::default())
                .with_shutdown(token.clone(), TaskTracker::new()),
        );
        let (sink, mut rx) = ChannelSink::new();
        let (_tx, inbound) = mpsc::unbounded_channel::<String>();
        let handle = tokio::spawn({
            let router = router.clone();
            async move {
                router
                    .handle_connection(
                        RequestContext::connection("127.0.0.1", "test"),
                        Box::new(sink),
                        UnboundedReceiverStream::new(inbound),
                        ConnectParams::default(),
                    )
                    .await
            }
        });
        tokio::task::yield_now().await;
        token.cancel();
        handle.await.unwrap().unwrap();
        assert!(rx.recv().await.is_none());
        assert_eq!(router.registry().count(), 0);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        let remote: SocketAddr = "10.1.1.1:5555".parse().unwrap();
        assert_eq!(client_ip(&headers, Some(remote)), "10.1.1.1");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(remote)), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new(), None), "");
    }
}
