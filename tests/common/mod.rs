//! Shared fixtures for the integration suites
//!
//! Each test boots its own engine on an ephemeral port with an in-memory
//! store and talks to it over real sockets.

#![allow(dead_code)]

use deck_engine::backend::server::{Engine, EngineBuilder};
use deck_engine::backend::store::MemoryStore;
use deck_engine::shared::{Envelope, EngineConfig, Session, User};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a test waits for anything to happen
pub const WAIT: Duration = Duration::from_secs(5);

/// A running engine plus the store behind it
pub struct TestEngine {
    pub engine: Engine,
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
}

impl TestEngine {
    /// Boot with defaults.
    pub async fn start() -> Self {
        Self::start_with(test_config(), |builder| builder).await
    }

    /// Boot with `config`, letting `configure` add endpoints or a service.
    pub async fn start_with(config: EngineConfig, configure: impl FnOnce(EngineBuilder) -> EngineBuilder) -> Self {
        let store = Arc::new(MemoryStore::new());
        let builder = Engine::builder(config).store(store.clone());
        let mut engine = configure(builder).build().await.expect("engine builds");
        let addr = engine.open().await.expect("engine listens");
        Self { engine, addr, store }
    }

    /// `ws://` URL of the socket endpoint with an optional query string
    pub fn url(&self, query: &str) -> String {
        if query.is_empty() {
            format!("ws://{}/deck_endpoint/", self.addr)
        } else {
            format!("ws://{}/deck_endpoint/?{}", self.addr, query)
        }
    }

    /// Open a raw socket and wait until the engine has registered it.
    pub async fn connect(&self, query: &str) -> Socket {
        let before = self.engine.registry().count();
        let mut request = self.url(query).into_client_request().expect("valid url");
        request
            .headers_mut()
            .insert(USER_AGENT, HeaderValue::from_static("deck-engine-tests"));
        let (socket, _) = connect_async(request).await.expect("websocket handshake");
        let registry = self.engine.registry().clone();
        eventually(|| {
            let registry = registry.clone();
            async move { registry.count() > before }
        })
        .await;
        socket
    }

    /// Store a session for a fresh user and return it.
    pub async fn session_for(&self, user: User) -> Session {
        let session = Session::new(user);
        self.store.insert_session(session.clone()).await;
        session
    }

    pub async fn shutdown(mut self) {
        self.engine.close().await;
    }
}

/// Config bound to an ephemeral loopback port
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.server.shutdown_timeout_secs = 2;
    config
}

/// Poll `condition` until it holds, panicking after [`WAIT`].
pub async fn eventually<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition().await {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Send one text frame.
pub async fn send_text(socket: &mut Socket, frame: &str) {
    socket.send(Message::text(frame.to_owned())).await.expect("send frame");
}

/// Send a request envelope built from `rpc` and `data`.
pub async fn send_request(socket: &mut Socket, rpc: &str, data: serde_json::Value) -> Envelope {
    let request = Envelope::request(rpc).with_payload(&data).expect("payload encodes");
    send_text(socket, &request.to_frame().expect("frame encodes")).await;
    request
}

/// Next text frame, raw.
pub async fn recv_text(socket: &mut Socket) -> String {
    loop {
        let frame = tokio::time::timeout(WAIT, socket.next())
            .await
            .expect("frame arrives in time")
            .expect("socket still open")
            .expect("frame reads");
        match frame {
            Message::Text(text) => return text.as_str().to_owned(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame {:?}", other),
        }
    }
}

/// Next text frame, parsed.
pub async fn recv_envelope(socket: &mut Socket) -> Envelope {
    Envelope::parse(&recv_text(socket).await).expect("frame parses")
}

/// Assert nothing arrives for a short while.
pub async fn assert_silent(socket: &mut Socket) {
    if let Ok(frame) = tokio::time::timeout(Duration::from_millis(150), socket.next()).await {
        panic!("unexpected frame {:?}", frame);
    }
}

/// Wait until the server closes the socket.
pub async fn expect_closed(socket: &mut Socket) {
    loop {
        match tokio::time::timeout(WAIT, socket.next()).await.expect("close arrives in time") {
            None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(other)) => panic!("unexpected frame before close {:?}", other),
        }
    }
}
