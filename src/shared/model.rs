/**
 * Session Model
 *
 * The handful of domain records the transport needs to know about. The store
 * owns persistence of all of them; the transport only reads them.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of a user as seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "nodeId")]
    pub id: Uuid,
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default)]
    pub admin: bool,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: String::new(),
            admin: false,
        }
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self {
            admin: true,
            ..Self::new(username)
        }
    }
}

/// An authenticated binding between a user and a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    /// User loaded alongside the session, when the store provided one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session for `user`.
    pub fn new(user: User) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user.id,
            user: Some(user),
            created_at: Utc::now(),
        }
    }

    /// Session row without a loaded user.
    pub fn for_user_id(id: Uuid, user_id: Uuid) -> Self {
        Self {
            id,
            user_id,
            user: None,
            created_at: Utc::now(),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map(|u| u.admin).unwrap_or(false)
    }
}

/// Global switches read on every inbound frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "maintenanceMode")]
    pub maintenance_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_binds_user_id() {
        let user = User::new("chad");
        let session = Session::new(user.clone());
        assert_eq!(session.user_id, user.id);
        assert_eq!(session.user(), Some(&user));
        assert!(!session.is_admin());
    }

    #[test]
    fn test_admin_flag() {
        let session = Session::new(User::admin("root"));
        assert!(session.is_admin());

        let bare = Session::for_user_id(Uuid::new_v4(), Uuid::new_v4());
        assert!(!bare.is_admin());
    }

    #[test]
    fn test_settings_wire_names() {
        let settings: Settings = serde_json::from_str(r#"{"maintenanceMode":true}"#).unwrap();
        assert!(settings.maintenance_mode);
        assert_eq!(serde_json::to_string(&settings).unwrap(), r#"{"maintenanceMode":true}"#);
    }
}
