// src/models/user.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Platform roles carried in the JWT and stored in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Represents the 'users' table in the database.
/// Rows are owned by the wider platform; this service only reads them.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
}

/// The caller, resolved by the auth middleware and stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Creator or super admin. Gates detail, private play, update and status changes.
    pub fn can_manage(&self, creator_id: Uuid) -> bool {
        self.id == creator_id || self.role == Role::SuperAdmin
    }

    /// Delete additionally allows plain admins.
    pub fn can_delete(&self, creator_id: Uuid) -> bool {
        self.can_manage(creator_id) || self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: "someone".to_string(),
            email: "someone@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_creator_can_manage_and_delete() {
        let creator = user(Role::User);
        assert!(creator.can_manage(creator.id));
        assert!(creator.can_delete(creator.id));
    }

    #[test]
    fn test_stranger_is_rejected() {
        let stranger = user(Role::User);
        let creator_id = Uuid::new_v4();
        assert!(!stranger.can_manage(creator_id));
        assert!(!stranger.can_delete(creator_id));
    }

    #[test]
    fn test_admin_can_only_delete() {
        let admin = user(Role::Admin);
        let creator_id = Uuid::new_v4();
        assert!(!admin.can_manage(creator_id));
        assert!(admin.can_delete(creator_id));
    }

    #[test]
    fn test_super_admin_can_do_everything() {
        let root = user(Role::SuperAdmin);
        let creator_id = Uuid::new_v4();
        assert!(root.can_manage(creator_id));
        assert!(root.can_delete(creator_id));
    }

    #[test]
    fn test_role_round_trips_through_text() {
        for role in [Role::User, Role::Admin, Role::SuperAdmin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::SuperAdmin).unwrap(), "\"SUPER_ADMIN\"");
    }
}
