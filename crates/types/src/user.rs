//! Users, roles, role assignments, auth tokens, and permission keys.

use serde::{Deserialize, Serialize};

use crate::workflow::null_as_empty;

/// Permission that grants every other permission.
pub const WILDCARD_PERMISSION: &str = "*";

/// Permission keys of the form `<area>.<action>`.
pub mod permissions {
    pub const USER_READ: &str = "user.read";
    pub const USER_CREATE: &str = "user.create";
    pub const USER_UPDATE: &str = "user.update";
    pub const USER_DELETE: &str = "user.delete";
    pub const ROLE_READ: &str = "role.read";
    pub const ROLE_CREATE: &str = "role.create";
    pub const ROLE_UPDATE: &str = "role.update";
    pub const ROLE_DELETE: &str = "role.delete";
    pub const TICKET_READ: &str = "ticket.read";
    pub const TICKET_CREATE: &str = "ticket.create";
    pub const TICKET_UPDATE: &str = "ticket.update";
    pub const TICKET_DELETE: &str = "ticket.delete";
    pub const TICKET_TEMPLATE_READ: &str = "ticket_template.read";
    pub const TICKET_TEMPLATE_CREATE: &str = "ticket_template.create";
    pub const TICKET_TEMPLATE_UPDATE: &str = "ticket_template.update";
    pub const TICKET_TEMPLATE_DELETE: &str = "ticket_template.delete";
    pub const RESOURCE_TYPE_READ: &str = "resource_type.read";
    pub const RESOURCE_TYPE_CREATE: &str = "resource_type.create";
    pub const RESOURCE_TYPE_UPDATE: &str = "resource_type.update";
    pub const RESOURCE_TYPE_DELETE: &str = "resource_type.delete";
    pub const RESOURCE_ENTRY_READ: &str = "resource_entry.read";
    pub const RESOURCE_ENTRY_CREATE: &str = "resource_entry.create";
    pub const RESOURCE_ENTRY_UPDATE: &str = "resource_entry.update";
    pub const RESOURCE_ENTRY_DELETE: &str = "resource_entry.delete";

    /// Areas that carry the four CRUD actions.
    pub const AREAS: [&str; 6] = ["user", "role", "ticket", "ticket_template", "resource_type", "resource_entry"];
    pub const ACTIONS: [&str; 4] = ["read", "create", "update", "delete"];

    /// Every known permission key, area by area.
    pub fn all() -> Vec<String> {
        AREAS
            .iter()
            .flat_map(|area| ACTIONS.iter().map(move |action| format!("{area}.{action}")))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().filter(|name| !name.trim().is_empty()).unwrap_or(&self.username)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub permissions: Vec<String>,
}

/// Payload for creating or updating a role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

/// Assignment of a role to a user, optionally with a supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
    #[serde(default)]
    pub reports_to_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleCreate {
    pub user_id: i64,
    pub role_id: i64,
    pub reports_to_id: Option<i64>,
}

/// Response of the login and refresh endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_catalog_covers_every_area() {
        let all = permissions::all();
        assert_eq!(all.len(), 24);
        assert!(all.contains(&permissions::TICKET_TEMPLATE_UPDATE.to_string()));
        assert!(all.contains(&permissions::RESOURCE_ENTRY_DELETE.to_string()));
    }

    #[test]
    fn display_name_prefers_full_name() {
        let mut user: User = serde_json::from_str(r#"{"id":1,"email":"a@b.c","username":"ada","full_name":null}"#).expect("user");
        assert_eq!(user.display_name(), "ada");
        user.full_name = Some("Ada Lovelace".into());
        assert_eq!(user.display_name(), "Ada Lovelace");
        assert!(user.is_active);
    }
}
