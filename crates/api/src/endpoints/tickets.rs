use flowdesk_types::{Ticket, TicketCreate, TicketUpdate};
use reqwest::Method;

use crate::{ApiError, FlowdeskClient};

impl FlowdeskClient {
    pub async fn list_tickets(&self) -> Result<Vec<Ticket>, ApiError> {
        self.send_json(self.request(Method::GET, "/tickets")).await
    }

    pub async fn get_ticket(&self, id: i64) -> Result<Ticket, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/tickets/{id}"))).await
    }

    pub async fn create_ticket(&self, ticket: &TicketCreate) -> Result<Ticket, ApiError> {
        self.send_json(self.request(Method::POST, "/tickets").json(ticket)).await
    }

    pub async fn update_ticket(&self, id: i64, update: &TicketUpdate) -> Result<Ticket, ApiError> {
        self.send_json(self.request(Method::PUT, &format!("/tickets/{id}")).json(update)).await
    }

    pub async fn delete_ticket(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/tickets/{id}"))).await
    }
}
