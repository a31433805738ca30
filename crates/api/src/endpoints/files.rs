use bytes::Bytes;
use flowdesk_types::{FileReference, LocalFile};
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::encode_segment;
use crate::{ApiError, FlowdeskClient};

/// One stored file as reported by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub original_name: String,
    pub saved_name: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
}

impl From<UploadedFile> for FileReference {
    fn from(file: UploadedFile) -> Self {
        FileReference {
            original_name: file.original_name,
            saved_name: file.saved_name,
        }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    files: Vec<UploadedFile>,
}

impl FlowdeskClient {
    /// Upload local files in one multipart request, each under the `files` part name.
    pub async fn upload_files(&self, files: &[LocalFile]) -> Result<Vec<UploadedFile>, ApiError> {
        let mut form = Form::new();
        for file in files {
            let content = tokio::fs::read(&file.path).await?;
            debug!(name = %file.name, bytes = content.len(), "attaching upload");
            form = form.part("files", Part::bytes(content).file_name(file.name.clone()));
        }
        let response: UploadResponse = self.send_json(self.request(Method::POST, "/files/upload").multipart(form)).await?;
        info!(count = response.files.len(), "uploaded files");
        Ok(response.files)
    }

    pub async fn delete_file(&self, saved_name: &str) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/files/{}", encode_segment(saved_name))))
            .await
    }

    pub async fn download_file(&self, saved_name: &str) -> Result<Bytes, ApiError> {
        let response = self.send(self.request(Method::GET, &format!("/files/download/{}", encode_segment(saved_name)))).await?;
        Ok(response.bytes().await?)
    }

    /// Direct link used for previews.
    pub fn download_url(&self, saved_name: &str) -> String {
        self.url(&format!("/files/download/{}", encode_segment(saved_name)))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn download_url_escapes_the_saved_name() {
        let client = FlowdeskClient::new("http://localhost:8000", Duration::from_secs(1)).expect("client");
        assert_eq!(client.download_url("a b.png"), "http://localhost:8000/files/download/a%20b.png");
    }

    #[test]
    fn upload_response_converts_to_references() {
        let response: UploadResponse = serde_json::from_str(
            r#"{"files":[{"original_name":"cv.pdf","saved_name":"0a1b.pdf","content_type":"application/pdf","size":12}]}"#,
        )
        .expect("response");
        let reference: FileReference = response.files[0].clone().into();
        assert_eq!(reference.saved_name, "0a1b.pdf");
        assert_eq!(reference.original_name, "cv.pdf");
    }
}
