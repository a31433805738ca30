//! Collaborator traits consumed by the form engine and the assistant.
//!
//! The engine never talks to [`FlowdeskClient`] directly; it goes through
//! these seams so tests can substitute in-memory fakes.

use async_trait::async_trait;
use flowdesk_types::{LocalFile, ResourceEntry};

use crate::chat::{ChatMessage, ChatStream};
use crate::endpoints::files::UploadedFile;
use crate::{ApiError, FlowdeskClient};

/// Supplies the candidate entries of a resource-bound field.
#[async_trait]
pub trait ResourceEntrySource: Send + Sync {
    async fn entries_for_type(&self, resource_type_id: i64) -> Result<Vec<ResourceEntry>, ApiError>;
}

/// Backing storage for server-mode file fields.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(&self, files: &[LocalFile]) -> Result<Vec<UploadedFile>, ApiError>;

    async fn delete(&self, saved_name: &str) -> Result<(), ApiError>;
}

/// Opens streaming assistant replies.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, endpoint: &str, messages: &[ChatMessage]) -> Result<ChatStream, ApiError>;
}

#[async_trait]
impl ResourceEntrySource for FlowdeskClient {
    async fn entries_for_type(&self, resource_type_id: i64) -> Result<Vec<ResourceEntry>, ApiError> {
        self.resource_entries(resource_type_id).await
    }
}

#[async_trait]
impl FileStore for FlowdeskClient {
    async fn upload(&self, files: &[LocalFile]) -> Result<Vec<UploadedFile>, ApiError> {
        self.upload_files(files).await
    }

    async fn delete(&self, saved_name: &str) -> Result<(), ApiError> {
        self.delete_file(saved_name).await
    }
}

#[async_trait]
impl ChatTransport for FlowdeskClient {
    async fn open(&self, endpoint: &str, messages: &[ChatMessage]) -> Result<ChatStream, ApiError> {
        self.open_chat(endpoint, messages).await
    }
}
