//! Accepted connection metadata.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::backend::error::BackendError;
use crate::backend::protocol::context::RequestContext;

/// Metadata pinned to one accepted WebSocket.
#[derive(Debug)]
pub struct Connection {
    pub ip_address: String,
    pub user_agent: String,
    admin_panel: AtomicBool,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// Build a connection from the values the upgrade handler put in `ctx`.
    ///
    /// # Errors
    ///
    /// Protocol error if the IP address or user agent was never seeded.
    pub fn from_context(ctx: &RequestContext) -> Result<Self, BackendError> {
        let user_agent = ctx
            .user_agent
            .clone()
            .ok_or_else(|| BackendError::protocol("unexpected value for user agent"))?;
        let ip_address = ctx
            .ip_address
            .clone()
            .ok_or_else(|| BackendError::protocol("unexpected value for IP address"))?;
        Ok(Self {
            ip_address,
            user_agent,
            admin_panel: AtomicBool::new(false),
            created_at: Utc::now(),
        })
    }

    /// Whether the client connected from the admin panel
    pub fn admin_panel(&self) -> bool {
        self.admin_panel.load(Ordering::Relaxed)
    }

    pub(crate) fn set_admin_panel(&self, value: bool) {
        self.admin_panel.store(value, Ordering::Relaxed);
    }
}
