use flowdesk_types::{TokenResponse, User, UserCreate, UserRole, UserRoleCreate, UserUpdate};
use reqwest::Method;
use serde::Serialize;
use url::form_urlencoded;

use crate::{ApiError, FlowdeskClient};

#[derive(Serialize)]
struct UserRoleBody {
    user_id: i64,
    role_id: i64,
    reports_to_id: Option<i64>,
}

impl FlowdeskClient {
    /// Exchange credentials for tokens. The backend expects an OAuth2 password form.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("password", password)
            .finish();
        let request = self
            .request(Method::POST, "/users/login")
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        self.send_json(request).await
    }

    /// Trade a refresh token for a new token pair.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenResponse, ApiError> {
        let request = self.http.post(self.url("/users/refresh")).bearer_auth(refresh_token);
        self.send_json(request).await
    }

    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.send_json(self.request(Method::GET, "/users/me")).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.send_json(self.request(Method::GET, "/users")).await
    }

    pub async fn get_user(&self, id: i64) -> Result<User, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/users/{id}"))).await
    }

    pub async fn create_user(&self, user: &UserCreate) -> Result<User, ApiError> {
        self.send_json(self.request(Method::POST, "/users").json(user)).await
    }

    pub async fn update_user(&self, id: i64, user: &UserUpdate) -> Result<User, ApiError> {
        self.send_json(self.request(Method::PUT, &format!("/users/{id}")).json(user)).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/users/{id}"))).await
    }

    /// Role assignments held by a user.
    pub async fn user_roles(&self, user_id: i64) -> Result<Vec<UserRole>, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/users/{user_id}/roles"))).await
    }

    pub async fn assign_user_role(&self, assignment: &UserRoleCreate) -> Result<UserRole, ApiError> {
        let body = UserRoleBody {
            user_id: assignment.user_id,
            role_id: assignment.role_id,
            reports_to_id: assignment.reports_to_id,
        };
        let path = format!("/users/{}/roles", assignment.user_id);
        self.send_json(self.request(Method::POST, &path).json(&body)).await
    }

    /// Removes every role assignment of a user.
    pub async fn clear_user_roles(&self, user_id: i64) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/users/{user_id}/roles"))).await
    }
}
