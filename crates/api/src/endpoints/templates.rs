use flowdesk_types::TicketTemplate;
use reqwest::Method;
use tracing::info;

use crate::{ApiError, FlowdeskClient};

impl FlowdeskClient {
    pub async fn list_templates(&self) -> Result<Vec<TicketTemplate>, ApiError> {
        self.send_json(self.request(Method::GET, "/ticket-templates")).await
    }

    pub async fn get_template(&self, id: i64) -> Result<TicketTemplate, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/ticket-templates/{id}"))).await
    }

    /// Create a template. Server assigned members (`id`, timestamps) are skipped when absent.
    pub async fn create_template(&self, template: &TicketTemplate) -> Result<TicketTemplate, ApiError> {
        let created: TicketTemplate = self.send_json(self.request(Method::POST, "/ticket-templates").json(template)).await?;
        info!(id = ?created.id, name = %created.name, "created ticket template");
        Ok(created)
    }

    pub async fn update_template(&self, id: i64, template: &TicketTemplate) -> Result<TicketTemplate, ApiError> {
        self.send_json(self.request(Method::PUT, &format!("/ticket-templates/{id}")).json(template)).await
    }

    pub async fn delete_template(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/ticket-templates/{id}"))).await
    }
}
