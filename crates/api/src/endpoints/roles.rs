use flowdesk_types::{Role, RoleInput, User};
use reqwest::Method;

use crate::{ApiError, FlowdeskClient};

impl FlowdeskClient {
    pub async fn list_roles(&self) -> Result<Vec<Role>, ApiError> {
        self.send_json(self.request(Method::GET, "/roles")).await
    }

    pub async fn get_role(&self, id: i64) -> Result<Role, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/roles/{id}"))).await
    }

    pub async fn create_role(&self, role: &RoleInput) -> Result<Role, ApiError> {
        self.send_json(self.request(Method::POST, "/roles").json(role)).await
    }

    pub async fn update_role(&self, id: i64, role: &RoleInput) -> Result<Role, ApiError> {
        self.send_json(self.request(Method::PUT, &format!("/roles/{id}")).json(role)).await
    }

    pub async fn delete_role(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/roles/{id}"))).await
    }

    /// Users holding a role.
    pub async fn role_users(&self, id: i64) -> Result<Vec<User>, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/roles/{id}/users"))).await
    }
}
