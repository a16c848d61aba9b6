/**
 * Connection Registry
 *
 * Process-wide directory of live writers. Writers are indexed by writer id
 * and, once authenticated, by user id.
 *
 * # Invariants
 *
 * - every writer listed under user `u` is authenticated as `u`
 * - no writer is listed under two users
 * - a user with no writers has no entry
 *
 * # Locking
 *
 * One lock guards both indexes and the open-duration timers. The user index
 * stores writer ids rather than writers, and snapshots are copied out under
 * the read lock, so callers never iterate while holding it.
 *
 * # Metrics
 *
 * - `deck_engine_total_connections` (gauge)
 * - `deck_engine_unique_users_connected` (gauge)
 * - `deck_engine_connection_length_seconds` (histogram, `username` label when known)
 */

use metrics::{describe_gauge, describe_histogram, gauge, histogram};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::protocol::connection::Connection;
use crate::backend::protocol::context::RequestContext;
use crate::backend::protocol::push_writer::{FrameSink, PushWriter};
use crate::shared::{Envelope, Session};

const TOTAL_CONNECTIONS: &str = "deck_engine_total_connections";
const UNIQUE_USERS: &str = "deck_engine_unique_users_connected";
const CONNECTION_LENGTH: &str = "deck_engine_connection_length_seconds";

#[derive(Default)]
struct RegistryState {
    writers: HashMap<Uuid, PushWriter>,
    writers_by_user: HashMap<Uuid, HashSet<Uuid>>,
    opened_at: HashMap<Uuid, Instant>,
}

impl RegistryState {
    fn unbind(&mut self, user_id: Uuid, writer_id: Uuid) {
        if let Some(set) = self.writers_by_user.get_mut(&user_id) {
            set.remove(&writer_id);
            if set.is_empty() {
                self.writers_by_user.remove(&user_id);
            }
        }
    }

    fn update_gauges(&self) {
        gauge!(TOTAL_CONNECTIONS).set(self.writers.len() as f64);
        gauge!(UNIQUE_USERS).set(self.writers_by_user.len() as f64);
    }
}

/// Directory of live writers
#[derive(Default)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        describe_gauge!(TOTAL_CONNECTIONS, "Number of open WebSocket connections");
        describe_gauge!(UNIQUE_USERS, "Number of distinct authenticated users connected");
        describe_histogram!(CONNECTION_LENGTH, "How long connections stay open");
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new connection and return its writer.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Connection context carrying IP address and user agent
    /// * `sink` - Send half of the socket
    ///
    /// # Errors
    ///
    /// Protocol error when `ctx` lacks the IP address or the user agent.
    pub fn register(
        &self,
        ctx: &RequestContext,
        sink: Box<dyn FrameSink>,
    ) -> Result<PushWriter, BackendError> {
        let connection = Connection::from_context(ctx)?;
        let writer = PushWriter::new(connection, sink);

        let mut state = self.write();
        state.writers.insert(writer.id(), writer.clone());
        state.opened_at.insert(writer.id(), Instant::now());
        state.update_gauges();
        Ok(writer)
    }

    /// Remove a writer and observe how long it was connected.
    pub fn deregister(&self, writer: &PushWriter) {
        let mut state = self.write();
        if state.writers.remove(&writer.id()).is_none() {
            return;
        }
        let session = writer.session();
        if let Some(session) = &session {
            state.unbind(session.user_id, writer.id());
        }
        state.update_gauges();

        if let Some(opened_at) = state.opened_at.remove(&writer.id()) {
            let seconds = opened_at.elapsed().as_secs_f64();
            match session.as_ref().and_then(|s| s.user()) {
                Some(user) => histogram!(CONNECTION_LENGTH, "username" => user.username.clone())
                    .record(seconds),
                None => histogram!(CONNECTION_LENGTH).record(seconds),
            }
        }
    }

    /// Bind `session` to `writer` and index the writer under its user.
    ///
    /// Authenticating an already authenticated writer replaces the prior
    /// binding.
    pub fn authenticate(&self, writer: &PushWriter, session: Arc<Session>) {
        let mut state = self.write();
        if let Some(previous) = writer.identity().user_id() {
            state.unbind(previous, writer.id());
        }
        let user_id = session.user_id;
        writer.set_session(Some(session));
        // A login can complete after its socket went away.
        if !state.writers.contains_key(&writer.id()) {
            return;
        }
        state
            .writers_by_user
            .entry(user_id)
            .or_default()
            .insert(writer.id());
        state.update_gauges();
    }

    /// Drop the session bound to `writer`.
    pub fn deauthenticate(&self, writer: &PushWriter) {
        let mut state = self.write();
        let Some(user_id) = writer.identity().user_id() else {
            tracing::error!(writer_id = %writer.id(), "deauthenticate called on writer without a session");
            return;
        };
        state.unbind(user_id, writer.id());
        writer.set_session(None);
        state.update_gauges();
    }

    /// Snapshot of every live writer
    pub fn writers(&self) -> Vec<PushWriter> {
        self.read().writers.values().cloned().collect()
    }

    /// Snapshot of the writers authenticated as `user_id`
    ///
    /// Empty when the user has no connection.
    pub fn writers_by_user(&self, user_id: Uuid) -> Vec<PushWriter> {
        let state = self.read();
        state
            .writers_by_user
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.writers.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of live writers
    pub fn count(&self) -> usize {
        self.read().writers.len()
    }

    /// Number of users with at least one authenticated writer
    pub fn unique_users(&self) -> usize {
        self.read().writers_by_user.len()
    }

    /// Encode `message` to every writer of `user_id`.
    ///
    /// Best effort: every writer is attempted and the first error is
    /// returned.
    pub async fn encode_to(&self, user_id: Uuid, message: &Envelope) -> Result<(), BackendError> {
        let mut first_error = None;
        for writer in self.writers_by_user(user_id) {
            if let Err(err) = writer.encode(message).await {
                tracing::error!(writer_id = %writer.id(), error = %err, "failed to encode message");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
