/**
 * Fan-out
 *
 * Relays pushes between processes. Publishing sends an envelope to the bus;
 * listening delivers every envelope seen on the bus to the matching local
 * writers.
 *
 * A process that publishes also listens, so a push it originated reaches its
 * own writers twice: once directly, once through the bus. Clients tolerate
 * the duplicate.
 */

use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::protocol::{ConnectionRegistry, PushWriter};
use crate::backend::push::bus::{PubSub, UserMessage, PUSH_ALL, PUSH_USER};
use crate::shared::Envelope;

/// Bridge between the local registry and a [`PubSub`] bus
#[derive(Clone)]
pub struct FanOut {
    bus: Arc<dyn PubSub>,
    registry: Arc<ConnectionRegistry>,
}

impl FanOut {
    pub fn new(bus: Arc<dyn PubSub>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { bus, registry }
    }

    pub async fn publish_to_all(&self, message: &Envelope) -> Result<(), BackendError> {
        self.bus.publish(PUSH_ALL, message.to_frame()?).await
    }

    pub async fn publish_to_user(&self, user_id: Uuid, message: &Envelope) -> Result<(), BackendError> {
        let payload = serde_json::to_string(&UserMessage {
            message: message.clone(),
            user_id,
        })?;
        self.bus.publish(PUSH_USER, payload).await
    }

    /// Subscribe to both topics and relay until `shutdown` is cancelled.
    ///
    /// Both subscriptions are active when this returns; the relay loops run
    /// on `tasks`.
    pub async fn listen(&self, shutdown: CancellationToken, tasks: &TaskTracker) -> Result<(), BackendError> {
        let all = self.bus.subscribe(PUSH_ALL).await?;
        let user = self.bus.subscribe(PUSH_USER).await?;
        tracing::info!("[FanOut] Listening on {} and {}", PUSH_ALL, PUSH_USER);

        tasks.spawn(relay(Arc::clone(&self.registry), all, shutdown.clone(), Topic::All));
        tasks.spawn(relay(Arc::clone(&self.registry), user, shutdown, Topic::User));
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Topic {
    All,
    User,
}

async fn relay(
    registry: Arc<ConnectionRegistry>,
    mut stream: BoxStream<'static, String>,
    shutdown: CancellationToken,
    topic: Topic,
) {
    loop {
        let payload = tokio::select! {
            _ = shutdown.cancelled() => break,
            payload = stream.next() => match payload {
                Some(payload) => payload,
                None => break,
            },
        };

        let delivery = match topic {
            Topic::All => Envelope::parse(&payload).map(|message| (message, registry.writers())),
            Topic::User => serde_json::from_str::<UserMessage>(&payload)
                .map(|m| (m.message, registry.writers_by_user(m.user_id)))
                .map_err(Into::into),
        };
        match delivery {
            Ok((message, writers)) => deliver(&message, writers).await,
            Err(err) => tracing::error!(error = %err, "[FanOut] Dropping undecodable bus payload"),
        }
    }
}

/// Encode `message` to each writer, logging failures.
pub(crate) async fn deliver(message: &Envelope, writers: Vec<PushWriter>) {
    for writer in writers {
        if let Err(err) = writer.encode(message).await {
            tracing::error!(writer_id = %writer.id(), rpc = %message.rpc, error = %err, "push failed");
        }
    }
}
