/**
 * PostgreSQL Store
 *
 * Reads sessions, users and settings through a `sqlx` connection pool.
 *
 * # Tables
 *
 * - `sessions (id UUID, user_id UUID, created_at TIMESTAMPTZ)`
 * - `users (id UUID, username TEXT, email TEXT, admin BOOLEAN)`
 * - `settings (maintenance_mode BOOLEAN)`, one row
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::store::Store;
use crate::shared::{Session, Settings, User};

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    admin: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            admin: row.admin,
        }
    }
}

#[derive(Debug, FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SettingsRow {
    maintenance_mode: bool,
}

/// Store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url`.
    ///
    /// # Errors
    ///
    /// Store error when the pool cannot be created.
    pub async fn connect(database_url: &str) -> Result<Self, BackendError> {
        tracing::info!("[Store] Connecting to database...");
        let pool = PgPool::connect(database_url).await?;
        tracing::info!("[Store] Database connection pool created successfully");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, BackendError> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT id, user_id, created_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let user = self.get_user(row.user_id).await?;
        Ok(Some(Session {
            id: row.id,
            user_id: row.user_id,
            user,
            created_at: row.created_at,
        }))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, BackendError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, admin FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn get_settings(&self) -> Result<Settings, BackendError> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT maintenance_mode FROM settings LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .map(|row| Settings {
                maintenance_mode: row.maintenance_mode,
            })
            .unwrap_or_default())
    }
}
