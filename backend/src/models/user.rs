use chrono::{DateTime, Utc};
use serde::Serialize;

/// Administrator permission level.
pub const PERMISSION_ADMIN: i64 = 1;
/// Ordinary user permission level.
pub const PERMISSION_ORDINARY: i64 = 0;

/// User record created on first GitHub login.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Surrogate primary key, assigned at insertion
    pub id: i64,
    /// GitHub subject id, unique, never rewritten after first login
    pub openid: String,
    /// Display name, re-synced from GitHub on every login
    pub username: String,
    /// Avatar URL, re-synced from GitHub on every login
    pub avatar: Option<String>,
    /// Permission level; only ever set at insertion or by admin action
    pub permission: i64,
    /// When the user first registered
    pub created_at: DateTime<Utc>,
    /// When the user record was last re-synced
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.permission == PERMISSION_ADMIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_permission(permission: i64) -> User {
        User {
            id: 1,
            openid: "42".to_string(),
            username: "octocat".to_string(),
            avatar: None,
            permission,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn admin_permission_level_is_admin() {
        assert!(user_with_permission(PERMISSION_ADMIN).is_admin());
    }

    #[test]
    fn ordinary_permission_level_is_not_admin() {
        assert!(!user_with_permission(PERMISSION_ORDINARY).is_admin());
    }
}
