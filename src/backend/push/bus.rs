/**
 * Pub/Sub Bus
 *
 * Carries push envelopes between server processes. Payloads are JSON text:
 *
 * - `push:all` carries an [`Envelope`]
 * - `push:user` carries a [`UserMessage`] (`{"message": ..., "userID": ...}`)
 *
 * # Implementations
 *
 * - **`LocalBus`** - one `tokio::sync::broadcast` channel per topic; only
 *   reaches subscribers inside this process
 * - **`RedisBus`** - Redis `PUBLISH` / `SUBSCRIBE`
 */

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{future, StreamExt};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::shared::Envelope;

/// Topic for pushes addressed to every connection
pub const PUSH_ALL: &str = "push:all";

/// Topic for pushes addressed to one user's connections
pub const PUSH_USER: &str = "push:user";

const LOCAL_BUS_CAPACITY: usize = 1024;

/// Payload published on [`PUSH_USER`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub message: Envelope,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
}

/// Publish/subscribe over named topics
#[async_trait]
pub trait PubSub: Send + Sync {
    /// Publish `payload` on `topic`. Publishing with no subscriber succeeds.
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BackendError>;

    /// Subscribe to `topic`.
    ///
    /// The subscription is active once this returns; messages published
    /// afterwards are yielded by the stream.
    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, String>, BackendError>;
}

/// In-process bus
#[derive(Debug, Default)]
pub struct LocalBus {
    topics: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(LOCAL_BUS_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl PubSub for LocalBus {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BackendError> {
        // No receivers is not an error for a bus.
        let _ = self.sender(topic).send(payload);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, String>, BackendError> {
        let topic_name = topic.to_string();
        let stream = BroadcastStream::new(self.sender(topic).subscribe()).filter_map(move |item| {
            future::ready(match item {
                Ok(payload) => Some(payload),
                Err(err) => {
                    tracing::warn!(topic = %topic_name, error = %err, "bus subscriber lagged");
                    None
                }
            })
        });
        Ok(stream.boxed())
    }
}

/// Redis-backed bus
pub struct RedisBus {
    client: redis::Client,
    publisher: redis::aio::MultiplexedConnection,
}

impl RedisBus {
    /// Connect to the Redis server at `url`.
    ///
    /// # Errors
    ///
    /// Bus error when the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        tracing::info!("[Bus] Connecting to Redis...");
        let client = redis::Client::open(url)?;
        let publisher = client.get_multiplexed_async_connection().await?;
        tracing::info!("[Bus] Redis connection established");
        Ok(Self { client, publisher })
    }
}

#[async_trait]
impl PubSub for RedisBus {
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BackendError> {
        let mut conn = self.publisher.clone();
        let _: () = conn.publish(topic, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<BoxStream<'static, String>, BackendError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(topic).await?;
        let topic_name = topic.to_string();
        let stream = pubsub.into_on_message().filter_map(move |msg| {
            future::ready(match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(err) => {
                    tracing::warn!(topic = %topic_name, error = %err, "dropping non-text bus payload");
                    None
                }
            })
        });
        Ok(stream.boxed())
    }
}

/// Open the bus named by `url`: Redis for `redis://` and `rediss://`,
/// otherwise an in-process bus.
pub async fn open_bus(url: &str) -> Result<Arc<dyn PubSub>, BackendError> {
    if url.starts_with("redis://") || url.starts_with("rediss://") {
        Ok(Arc::new(RedisBus::connect(url).await?))
    } else {
        tracing::info!(bus_url = %url, "[Bus] Using in-process bus");
        Ok(Arc::new(LocalBus::new()))
    }
}
