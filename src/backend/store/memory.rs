/**
 * In-memory Store
 *
 * Maps guarded by `tokio::sync::RwLock`. Sessions are stored without their
 * user and joined on read, the way a relational store would.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::store::Store;
use crate::shared::{Session, Settings, User};

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
    users: RwLock<HashMap<Uuid, User>>,
    settings: RwLock<Settings>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    /// Insert a session. A user carried by the session is inserted as well.
    pub async fn insert_session(&self, mut session: Session) {
        if let Some(user) = session.user.take() {
            self.insert_user(user).await;
        }
        self.sessions.write().await.insert(session.id, session);
    }

    pub async fn remove_session(&self, id: Uuid) {
        self.sessions.write().await.remove(&id);
    }

    pub async fn set_maintenance_mode(&self, enabled: bool) {
        self.settings.write().await.maintenance_mode = enabled;
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, BackendError> {
        let Some(mut session) = self.sessions.read().await.get(&id).cloned() else {
            return Ok(None);
        };
        session.user = self.users.read().await.get(&session.user_id).cloned();
        Ok(Some(session))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BackendError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_settings(&self) -> Result<Settings, BackendError> {
        Ok(self.settings.read().await.clone())
    }
}
