//! Store Module
//!
//! The transport reads sessions, users and the global settings; it never
//! writes them. Persistence belongs to the store behind this trait.
//!
//! # Implementations
//!
//! - **`MemoryStore`** - in-process maps, for tests and database-less runs
//! - **`PgStore`** - PostgreSQL via `sqlx`

use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::shared::{Session, Settings, User};

/// In-memory store
pub mod memory;

/// PostgreSQL store
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Read access to the records the transport depends on
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up a session, with its user loaded when one exists.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no session has this id
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, BackendError>;

    /// Look up a user.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BackendError>;

    /// Read the global settings.
    async fn get_settings(&self) -> Result<Settings, BackendError>;
}
