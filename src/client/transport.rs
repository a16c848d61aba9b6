/**
 * Client Transport
 *
 * One WebSocket per client. A background task reads every frame and routes
 * it:
 *
 * - a frame with a `requestID` is a push and goes to the push listeners
 * - any other frame is a response, delivered to the request whose id
 *   matches its `ack`
 *
 * A request registers its response slot before the frame is written, so a
 * fast response cannot be missed. The slot is removed when the request
 * completes, times out or fails. When the connection goes away every
 * pending request fails with `ConnectionLost`.
 */

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::USER_AGENT;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::client::error::ClientError;
use crate::shared::{ClientConfig, Envelope};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Sent on the upgrade request; the server logs it per connection.
const CLIENT_USER_AGENT: &str = concat!("deck-engine-client/", env!("CARGO_PKG_VERSION"));

#[derive(Default)]
struct Pending {
    connected: bool,
    requests: HashMap<String, oneshot::Sender<String>>,
}

struct Shared {
    sink: tokio::sync::Mutex<SplitSink<Socket, Message>>,
    pending: Mutex<Pending>,
    push_listeners: Mutex<Vec<mpsc::UnboundedSender<Envelope>>>,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch_push(&self, message: Envelope) {
        let mut listeners = self.push_listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|listener| listener.send(message.clone()).is_ok());
    }

    fn disconnect(&self) {
        let mut pending = self.pending();
        pending.connected = false;
        // Dropping the senders wakes every waiter with an error.
        pending.requests.clear();
        drop(pending);
        self.push_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// WebSocket RPC client
pub struct Client {
    config: ClientConfig,
    shared: Arc<Shared>,
    reader: JoinHandle<()>,
}

impl Client {
    /// Connect to `config.address`.
    ///
    /// # Errors
    ///
    /// `Config` for an address without `ws://` or `wss://`, `Transport` when
    /// the handshake fails.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let mut request = config.address.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        let (socket, _) = connect_async(request).await?;
        let (sink, stream) = socket.split();

        let shared = Arc::new(Shared {
            sink: tokio::sync::Mutex::new(sink),
            pending: Mutex::new(Pending {
                connected: true,
                requests: HashMap::new(),
            }),
            push_listeners: Mutex::new(Vec::new()),
        });
        let reader = tokio::spawn(read_loop(Arc::clone(&shared), stream));
        tracing::debug!(address = %config.address, "client connected");
        Ok(Self { config, shared, reader })
    }

    /// Send `message` and wait for the raw response frame.
    ///
    /// # Errors
    ///
    /// `Timeout` when no response arrives in time, `ConnectionLost` when the
    /// connection closes first.
    pub async fn send(&self, message: &Envelope) -> Result<String, ClientError> {
        let response = self.register_request(&message.request_id)?;
        let result = self.send_and_wait(message, response).await;
        self.unregister_request(&message.request_id);
        result
    }

    async fn send_and_wait(&self, message: &Envelope, response: oneshot::Receiver<String>) -> Result<String, ClientError> {
        let frame = message.to_frame()?;
        self.shared.sink.lock().await.send(Message::text(frame)).await?;

        match tokio::time::timeout(self.config.timeout, response).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(ClientError::ConnectionLost),
            Err(_) => Err(ClientError::Timeout),
        }
    }

    /// Call `rpc` with `params` and decode the response payload.
    ///
    /// # Errors
    ///
    /// `Remote` when the server answered with an error frame, otherwise as
    /// [`Client::send`].
    pub async fn call<P, R>(&self, rpc: &str, params: &P) -> Result<R, ClientError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let message = Envelope::request(rpc).with_payload(params)?;
        let response = self.send(&message).await?;
        Ok(decode_generic_response(&response)?.decode_payload()?)
    }

    /// Receive every push frame from now on.
    pub fn subscribe_pushes(&self) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .push_listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Number of requests waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.shared.pending().requests.len()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.pending().connected
    }

    /// Send a close frame.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.shared.sink.lock().await.close().await?;
        Ok(())
    }

    fn register_request(&self, id: &str) -> Result<oneshot::Receiver<String>, ClientError> {
        let mut pending = self.shared.pending();
        if !pending.connected {
            return Err(ClientError::ConnectionLost);
        }
        let (tx, rx) = oneshot::channel();
        pending.requests.insert(id.to_string(), tx);
        Ok(rx)
    }

    fn unregister_request(&self, id: &str) {
        self.shared.pending().requests.remove(id);
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.config.address)
            .field("connected", &self.is_connected())
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(shared: Arc<Shared>, mut stream: SplitStream<Socket>) {
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                tracing::error!(error = %err, "client read failed");
                break;
            }
        };

        let message = match Envelope::parse(&text) {
            Ok(message) => message,
            Err(err) => {
                tracing::error!(error = %err, "client received malformed frame");
                continue;
            }
        };
        if !message.request_id.is_empty() {
            shared.dispatch_push(message);
            continue;
        }

        let waiter = shared.pending().requests.remove(&message.ack);
        match waiter {
            Some(waiter) => {
                // The requester may have timed out in the meantime.
                let _ = waiter.send(text);
            }
            None => tracing::info!(ack = %message.ack, response = %text, "unmatched response"),
        }
    }
    shared.disconnect();
}

/// Parse a response frame, turning an error frame into `Err`.
pub fn decode_generic_response(response: &str) -> Result<Envelope, ClientError> {
    let message = Envelope::parse(response)?;
    match message.error_message() {
        Some(error) => Err(ClientError::Remote(error.to_string())),
        None => Ok(message),
    }
}
