/**
 * Push Writer
 *
 * A `PushWriter` is the only handle the rest of the server gets to a
 * connection. It owns the send half of the socket behind a mutex so every
 * frame goes out whole, and it carries the connection's current identity.
 *
 * # Identity
 *
 * A writer starts `Anonymous`. The registry moves it to `Authenticated` on
 * login and back to `Anonymous` on logout; nothing else changes it.
 *
 * # Sinks
 *
 * The socket is abstracted as a [`FrameSink`]:
 * - [`WebSocketSink`] - the send half of an axum WebSocket
 * - [`ChannelSink`] - an in-memory channel, used by tests and tools
 */

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::protocol::connection::Connection;
use crate::shared::{Envelope, Session};

/// Send side of a connection
#[async_trait]
pub trait FrameSink: Send {
    /// Send one complete text frame.
    async fn send_text(&mut self, frame: String) -> Result<(), BackendError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), BackendError>;
}

/// Send half of an axum WebSocket
pub struct WebSocketSink {
    inner: SplitSink<WebSocket, Message>,
}

impl WebSocketSink {
    pub fn new(inner: SplitSink<WebSocket, Message>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send_text(&mut self, frame: String) -> Result<(), BackendError> {
        self.inner.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.inner.send(Message::Close(None)).await?;
        self.inner.close().await?;
        Ok(())
    }
}

/// In-memory sink delivering frames to an unbounded channel
///
/// Closing drops the sender, so the receiving side observes `None`.
pub struct ChannelSink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_text(&mut self, frame: String) -> Result<(), BackendError> {
        match &self.tx {
            Some(tx) => tx
                .send(frame)
                .map_err(|_| BackendError::transport("connection closed")),
            None => Err(BackendError::transport("connection closed")),
        }
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        self.tx.take();
        Ok(())
    }
}

/// Who is on the other end of a writer
#[derive(Debug, Clone, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(Arc<Session>),
}

impl Identity {
    pub fn session(&self) -> Option<&Arc<Session>> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(session) => Some(session),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.session().map(|session| session.user_id)
    }
}

struct Inner {
    id: Uuid,
    connection: Connection,
    sink: Mutex<Box<dyn FrameSink>>,
    identity: RwLock<Identity>,
}

/// Concurrency-safe writer over one connection
///
/// Cloning is cheap and yields a handle to the same writer.
#[derive(Clone)]
pub struct PushWriter {
    inner: Arc<Inner>,
}

impl PushWriter {
    /// Wrap `sink` in a new writer with a fresh id.
    pub fn new(connection: Connection, sink: Box<dyn FrameSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                connection,
                sink: Mutex::new(sink),
                identity: RwLock::new(Identity::Anonymous),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Write one frame.
    ///
    /// Concurrent calls are serialized; a frame is never interleaved with
    /// another.
    pub async fn write(&self, frame: &str) -> Result<(), BackendError> {
        let mut sink = self.inner.sink.lock().await;
        sink.send_text(frame.to_owned()).await
    }

    /// Serialize `message` and write it as one frame.
    pub async fn encode(&self, message: &Envelope) -> Result<(), BackendError> {
        let frame = message.to_frame()?;
        self.write(&frame).await
    }

    /// Close the underlying connection.
    pub async fn close(&self) -> Result<(), BackendError> {
        let mut sink = self.inner.sink.lock().await;
        sink.close().await
    }

    pub fn identity(&self) -> Identity {
        self.inner
            .identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.identity().session().cloned()
    }

    pub fn authenticated(&self) -> bool {
        matches!(self.identity(), Identity::Authenticated(_))
    }

    /// Only the registry calls this, under its own lock.
    pub(crate) fn set_session(&self, session: Option<Arc<Session>>) {
        let mut identity = self
            .inner
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *identity = match session {
            Some(session) => Identity::Authenticated(session),
            None => Identity::Anonymous,
        };
    }
}

impl fmt::Debug for PushWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushWriter")
            .field("id", &self.inner.id)
            .field("ip_address", &self.inner.connection.ip_address)
            .field("identity", &self.identity())
            .finish()
    }
}
