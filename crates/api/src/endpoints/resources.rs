use flowdesk_types::{ResourceEntry, ResourceEntryCreate, ResourceType};
use reqwest::Method;

use crate::{ApiError, FlowdeskClient};

impl FlowdeskClient {
    pub async fn list_resource_types(&self) -> Result<Vec<ResourceType>, ApiError> {
        self.send_json(self.request(Method::GET, "/resources/types")).await
    }

    pub async fn get_resource_type(&self, id: i64) -> Result<ResourceType, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/resources/types/{id}"))).await
    }

    pub async fn create_resource_type(&self, resource_type: &ResourceType) -> Result<ResourceType, ApiError> {
        self.send_json(self.request(Method::POST, "/resources/types").json(resource_type)).await
    }

    pub async fn update_resource_type(&self, id: i64, resource_type: &ResourceType) -> Result<ResourceType, ApiError> {
        self.send_json(self.request(Method::PUT, &format!("/resources/types/{id}")).json(resource_type)).await
    }

    pub async fn delete_resource_type(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/resources/types/{id}"))).await
    }

    /// Entries of one resource type, used to populate resource-bound fields.
    pub async fn resource_entries(&self, resource_type_id: i64) -> Result<Vec<ResourceEntry>, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/resources/types/{resource_type_id}/entries")))
            .await
    }

    pub async fn get_resource_entry(&self, id: i64) -> Result<ResourceEntry, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/resources/entries/{id}"))).await
    }

    pub async fn create_resource_entry(&self, entry: &ResourceEntryCreate) -> Result<ResourceEntry, ApiError> {
        self.send_json(self.request(Method::POST, "/resources/entries").json(entry)).await
    }

    pub async fn update_resource_entry(&self, id: i64, entry: &ResourceEntryCreate) -> Result<ResourceEntry, ApiError> {
        self.send_json(self.request(Method::PUT, &format!("/resources/entries/{id}")).json(entry)).await
    }

    pub async fn delete_resource_entry(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/resources/entries/{id}"))).await
    }
}
