//! Application context: the signed-in session and its permission set.
//!
//! One [`AppContext`] is created at startup and handed to every component that
//! needs auth data. Writes happen only on login, logout, refresh, and
//! permission reload; readers take short locks and never hold them across an
//! await point.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use flowdesk_types::{User, WILDCARD_PERMISSION};
use flowdesk_util::{AUTH_STORAGE_KEY, LocalStore, LocalStoreExt, PERMISSIONS_STORAGE_KEY};
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{ApiError, FlowdeskClient};

/// Persisted part of the authentication state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, rename = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPermissions {
    #[serde(default)]
    permissions: BTreeSet<String>,
}

pub struct AppContext {
    client: FlowdeskClient,
    store: Arc<dyn LocalStore>,
    session: RwLock<Session>,
    permissions: RwLock<BTreeSet<String>>,
}

impl AppContext {
    /// Build the context, restoring any session and permissions found in `store`.
    pub fn new(client: FlowdeskClient, store: Arc<dyn LocalStore>) -> Self {
        let session = match store.load::<Session>(AUTH_STORAGE_KEY) {
            Ok(session) => session.unwrap_or_default(),
            Err(error) => {
                warn!(error = %error, "failed to read stored session");
                Session::default()
            }
        };
        let permissions = match store.load::<StoredPermissions>(PERMISSIONS_STORAGE_KEY) {
            Ok(stored) => stored.unwrap_or_default().permissions,
            Err(error) => {
                warn!(error = %error, "failed to read stored permissions");
                BTreeSet::new()
            }
        };
        client.set_access_token(session.token.clone());
        debug!(signed_in = session.token.is_some(), permissions = permissions.len(), "restored session");
        Self {
            client,
            store,
            session: RwLock::new(session),
            permissions: RwLock::new(permissions),
        }
    }

    pub fn client(&self) -> &FlowdeskClient {
        &self.client
    }

    pub fn session(&self) -> Session {
        self.session.read().expect("session lock poisoned").clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.read().expect("session lock poisoned").user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().expect("session lock poisoned").token.is_some()
    }

    /// True when the cached permission set holds `key` or the wildcard.
    pub fn has_permission(&self, key: &str) -> bool {
        let permissions = self.permissions.read().expect("permissions lock poisoned");
        permissions.contains(WILDCARD_PERMISSION) || permissions.contains(key)
    }

    pub fn has_permissions(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.has_permission(key))
    }

    pub fn has_any_permission(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.has_permission(key))
    }

    pub fn permissions(&self) -> BTreeSet<String> {
        self.permissions.read().expect("permissions lock poisoned").clone()
    }

    /// Sign in, then load the user and their permissions.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let tokens = self.client.login(username, password).await?;
        let token = tokens.access_token.ok_or(ApiError::MissingSession)?;
        self.update_session(|session| {
            session.token = Some(token.clone());
            session.refresh_token = tokens.refresh_token.clone();
        });
        self.client.set_access_token(Some(token));
        let user = self.fetch_current_user().await?;
        info!(user = %user.username, "signed in");
        Ok(user)
    }

    /// Reload `/users/me` and the permission set.
    pub async fn fetch_current_user(&self) -> Result<User, ApiError> {
        let user = self.client.current_user().await?;
        self.update_session(|session| session.user = Some(user.clone()));
        self.refresh_permissions().await?;
        Ok(user)
    }

    /// Rebuild the permission set as the union of the current user's roles.
    pub async fn refresh_permissions(&self) -> Result<BTreeSet<String>, ApiError> {
        let Some(user_id) = self.current_user().map(|user| user.id) else {
            self.store_permissions(BTreeSet::new());
            return Ok(BTreeSet::new());
        };

        let assignments = self.client.user_roles(user_id).await?;
        let roles = try_join_all(assignments.iter().map(|assignment| self.client.get_role(assignment.role_id))).await?;
        let permissions: BTreeSet<String> = roles.into_iter().flat_map(|role| role.permissions).collect();
        debug!(user_id, roles = assignments.len(), permissions = permissions.len(), "loaded permissions");
        self.store_permissions(permissions.clone());
        Ok(permissions)
    }

    /// Exchange the refresh token for a new pair. Any failure ends the session.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let Some(refresh_token) = self.session().refresh_token else {
            self.logout();
            return Err(ApiError::MissingSession);
        };

        match self.client.refresh_tokens(&refresh_token).await {
            Ok(tokens) => match (tokens.access_token, tokens.refresh_token) {
                (Some(access), Some(refresh)) => {
                    self.update_session(|session| {
                        session.token = Some(access.clone());
                        session.refresh_token = Some(refresh);
                    });
                    self.client.set_access_token(Some(access));
                    debug!("refreshed access token");
                    Ok(())
                }
                _ => {
                    warn!("refresh returned no tokens; clearing session");
                    self.logout();
                    Err(ApiError::MissingSession)
                }
            },
            Err(error) => {
                warn!(error = %error, "token refresh failed; clearing session");
                self.logout();
                Err(error)
            }
        }
    }

    /// Forget tokens, user, and permissions.
    pub fn logout(&self) {
        self.update_session(|session| *session = Session::default());
        self.client.set_access_token(None);
        self.store_permissions(BTreeSet::new());
        info!("signed out");
    }

    fn update_session(&self, apply: impl FnOnce(&mut Session)) {
        let snapshot = {
            let mut session = self.session.write().expect("session lock poisoned");
            apply(&mut session);
            session.clone()
        };
        if let Err(error) = self.store.save(AUTH_STORAGE_KEY, &snapshot) {
            warn!(error = %error, "failed to persist session");
        }
    }

    fn store_permissions(&self, permissions: BTreeSet<String>) {
        let stored = StoredPermissions { permissions };
        if let Err(error) = self.store.save(PERMISSIONS_STORAGE_KEY, &stored) {
            warn!(error = %error, "failed to persist permissions");
        }
        *self.permissions.write().expect("permissions lock poisoned") = stored.permissions;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use flowdesk_util::InMemoryLocalStore;

    use super::*;

    fn context_with(store: Arc<dyn LocalStore>) -> AppContext {
        let client = FlowdeskClient::new("http://localhost:9", Duration::from_secs(1)).expect("client");
        AppContext::new(client, store)
    }

    #[test]
    fn wildcard_grants_every_permission() {
        let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::new());
        store
            .save(PERMISSIONS_STORAGE_KEY, &serde_json::json!({"permissions": ["*"]}))
            .expect("seed permissions");
        let context = context_with(store);
        assert!(context.has_permission("ticket.delete"));
        assert!(context.has_permissions(&["user.read", "role.update"]));
    }

    #[test]
    fn explicit_permissions_are_checked_individually() {
        let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::new());
        store
            .save(PERMISSIONS_STORAGE_KEY, &serde_json::json!({"permissions": ["ticket.read"]}))
            .expect("seed permissions");
        let context = context_with(store);
        assert!(context.has_permission("ticket.read"));
        assert!(!context.has_permission("ticket.create"));
        assert!(context.has_any_permission(&["ticket.create", "ticket.read"]));
        assert!(!context.has_permissions(&["ticket.create", "ticket.read"]));
    }

    #[test]
    fn restores_session_and_installs_token() {
        let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::new());
        store
            .save(
                AUTH_STORAGE_KEY,
                &serde_json::json!({"token": "t1", "refreshToken": "r1", "user": {"id": 3, "email": "a@b.c", "username": "ada"}}),
            )
            .expect("seed session");
        let context = context_with(store.clone());
        assert!(context.is_authenticated());
        assert_eq!(context.client().access_token().as_deref(), Some("t1"));
        assert_eq!(context.current_user().map(|user| user.id), Some(3));

        context.logout();
        assert!(!context.is_authenticated());
        assert!(context.client().access_token().is_none());
        let stored: Option<Session> = store.load(AUTH_STORAGE_KEY).expect("load");
        assert_eq!(stored, Some(Session::default()));
    }

    #[tokio::test]
    async fn refresh_without_token_clears_session() {
        let store: Arc<dyn LocalStore> = Arc::new(InMemoryLocalStore::new());
        store
            .save(AUTH_STORAGE_KEY, &serde_json::json!({"token": "t1"}))
            .expect("seed session");
        let context = context_with(store);
        assert!(matches!(context.refresh().await, Err(ApiError::MissingSession)));
        assert!(!context.is_authenticated());
    }
}
