/**
 * Pusher
 *
 * Server-originated messages. Each push becomes an envelope with a fresh
 * request id, is written to the matching local writers, and is then
 * published on the bus when fan-out is enabled.
 *
 * Delivery is best effort: a failed write to one writer is logged and the
 * rest of the batch continues. Only building the envelope or publishing to
 * the bus can fail a push.
 */

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::protocol::ConnectionRegistry;
use crate::backend::push::fanout::{deliver, FanOut};
use crate::shared::rpc_names::push;
use crate::shared::Envelope;

#[derive(Serialize)]
struct EngagementUpdate<'a, E: Serialize> {
    #[serde(rename = "cardID")]
    card_id: &'a str,
    engagement: &'a E,
}

/// Sends pushes to local writers and, optionally, the bus
#[derive(Clone)]
pub struct Pusher {
    registry: Arc<ConnectionRegistry>,
    fan_out: Option<FanOut>,
}

impl Pusher {
    pub fn new(registry: Arc<ConnectionRegistry>, fan_out: Option<FanOut>) -> Self {
        Self { registry, fan_out }
    }

    pub fn fan_out(&self) -> Option<&FanOut> {
        self.fan_out.as_ref()
    }

    /// Push `payload` under `rpc` to every connection.
    ///
    /// # Errors
    ///
    /// Serialization error for an unencodable payload, bus error when the
    /// fan-out publish fails.
    pub async fn push_to_all<T: Serialize + ?Sized>(&self, rpc: &str, payload: &T) -> Result<(), BackendError> {
        let message = Envelope::push(rpc).with_payload(payload)?;
        deliver(&message, self.registry.writers()).await;
        if let Some(fan_out) = &self.fan_out {
            fan_out.publish_to_all(&message).await?;
        }
        Ok(())
    }

    /// Push `payload` under `rpc` to every connection of `user_id`.
    pub async fn push_to_user<T: Serialize + ?Sized>(
        &self,
        user_id: Uuid,
        rpc: &str,
        payload: &T,
    ) -> Result<(), BackendError> {
        let message = Envelope::push(rpc).with_payload(payload)?;
        deliver(&message, self.registry.writers_by_user(user_id)).await;
        if let Some(fan_out) = &self.fan_out {
            fan_out.publish_to_user(user_id, &message).await?;
        }
        Ok(())
    }

    pub async fn new_card<T: Serialize>(&self, card: &T) -> Result<(), BackendError> {
        self.push_to_all(push::NEW_CARD, card).await
    }

    pub async fn update_card<T: Serialize>(&self, card: &T) -> Result<(), BackendError> {
        self.push_to_all(push::UPDATE_CARD, card).await
    }

    pub async fn delete_card(&self, card_id: &str) -> Result<(), BackendError> {
        self.push_to_all(push::DELETE_CARD, card_id).await
    }

    pub async fn update_user<T: Serialize>(&self, user: &T) -> Result<(), BackendError> {
        self.push_to_all(push::UPDATE_USER, user).await
    }

    pub async fn new_notification<T: Serialize>(&self, user_id: Uuid, notification: &T) -> Result<(), BackendError> {
        self.push_to_user(user_id, push::NEW_NOTIFICATION, notification).await
    }

    pub async fn update_notification<T: Serialize>(&self, user_id: Uuid, notification: &T) -> Result<(), BackendError> {
        self.push_to_user(user_id, push::UPDATE_NOTIFICATION, notification).await
    }

    pub async fn update_coin_balance<T: Serialize>(&self, user_id: Uuid, balances: &T) -> Result<(), BackendError> {
        self.push_to_user(user_id, push::UPDATE_COIN_BALANCE, balances).await
    }

    /// Push new engagement numbers for a card to every authenticated
    /// connection.
    ///
    /// Each writer gets its own envelope, published on the bus under the
    /// writer's user. Publish failures are logged.
    pub async fn update_engagement<E: Serialize>(&self, card_id: &str, engagement: &E) -> Result<(), BackendError> {
        let update = EngagementUpdate { card_id, engagement };
        for writer in self.registry.writers() {
            let Some(user_id) = writer.identity().user_id() else {
                continue;
            };
            let message = Envelope::push(push::UPDATE_ENGAGEMENT).with_payload(&update)?;
            if let Err(err) = writer.encode(&message).await {
                tracing::error!(writer_id = %writer.id(), error = %err, "push failed");
            }
            if let Some(fan_out) = &self.fan_out {
                if let Err(err) = fan_out.publish_to_user(user_id, &message).await {
                    tracing::error!(user_id = %user_id, error = %err, "engagement publish failed");
                }
            }
        }
        Ok(())
    }
}
