//! File field upload state.
//!
//! A file field runs in one of two modes:
//!
//! - `Local`: dropped files are kept as local handles and nothing is sent
//!   until the owning form uploads them with [`upload_pending`].
//! - `Server`: dropped files are uploaded immediately and the field value
//!   holds the returned `{original_name, saved_name}` references. Deleting an
//!   entry deletes it on the server first.

use flowdesk_api::{ApiError, FileStore};
use flowdesk_types::{FileReference, LocalFile};
use tracing::{debug, warn};

use crate::value::{FieldValue, FormValues};

pub const UPLOAD_ERROR: &str = "Failed to upload files";
pub const DELETE_ERROR: &str = "Failed to delete file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadMode {
    Local,
    #[default]
    Server,
}

/// Entry shown in a file field's list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntry {
    Local(LocalFile),
    Stored(FileReference),
}

impl FileEntry {
    pub fn name(&self) -> &str {
        match self {
            FileEntry::Local(file) => &file.name,
            FileEntry::Stored(reference) => &reference.original_name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileUploadState {
    mode: UploadMode,
    local: Vec<LocalFile>,
    stored: Vec<FileReference>,
    uploading: bool,
    error: Option<String>,
}

impl FileUploadState {
    pub fn new(mode: UploadMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Restore state from a field value.
    pub fn from_value(mode: UploadMode, value: Option<&FieldValue>) -> Self {
        let mut state = Self::new(mode);
        match value {
            Some(FieldValue::LocalFiles(files)) => state.local = files.clone(),
            Some(other) => state.stored = other.file_references(),
            None => {}
        }
        state
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn entries(&self) -> Vec<FileEntry> {
        match self.mode {
            UploadMode::Local => self.local.iter().cloned().map(FileEntry::Local).collect(),
            UploadMode::Server => self.stored.iter().cloned().map(FileEntry::Stored).collect(),
        }
    }

    /// The value to bind into the owning form.
    pub fn value(&self) -> FieldValue {
        match self.mode {
            UploadMode::Local => FieldValue::LocalFiles(self.local.clone()),
            UploadMode::Server => FieldValue::from_file_references(&self.stored),
        }
    }

    /// Accept dropped files. In server mode they are uploaded right away and
    /// the returned references are appended to the existing ones.
    pub async fn drop_files(&mut self, files: Vec<LocalFile>, store: &dyn FileStore) -> Result<(), ApiError> {
        if files.is_empty() || self.uploading {
            return Ok(());
        }
        match self.mode {
            UploadMode::Local => {
                self.local.extend(files);
                Ok(())
            }
            UploadMode::Server => {
                self.uploading = true;
                self.error = None;
                let result = store.upload(&files).await;
                self.uploading = false;
                match result {
                    Ok(uploaded) => {
                        debug!(count = uploaded.len(), "file field upload complete");
                        self.stored.extend(uploaded.into_iter().map(FileReference::from));
                        Ok(())
                    }
                    Err(error) => {
                        warn!(error = %error, "file upload failed");
                        self.error = Some(UPLOAD_ERROR.to_string());
                        Err(error)
                    }
                }
            }
        }
    }

    /// Remove the entry at `index`. In server mode the stored file is deleted
    /// first and the entry is kept if that fails.
    pub async fn delete(&mut self, index: usize, store: &dyn FileStore) -> Result<(), ApiError> {
        match self.mode {
            UploadMode::Local => {
                if index < self.local.len() {
                    self.local.remove(index);
                }
                Ok(())
            }
            UploadMode::Server => {
                let Some(reference) = self.stored.get(index) else {
                    return Ok(());
                };
                match store.delete(&reference.saved_name).await {
                    Ok(()) => {
                        self.stored.remove(index);
                        Ok(())
                    }
                    Err(error) => {
                        warn!(error = %error, saved_name = %reference.saved_name, "file delete failed");
                        self.error = Some(DELETE_ERROR.to_string());
                        Err(error)
                    }
                }
            }
        }
    }
}

/// Upload every pending local file in `values`, replacing each list of local
/// handles with the server references.
pub async fn upload_pending(values: &mut FormValues, store: &dyn FileStore) -> Result<(), ApiError> {
    for (field_id, value) in values.iter_mut() {
        let FieldValue::LocalFiles(files) = value else {
            continue;
        };
        if files.is_empty() {
            *value = FieldValue::Json(serde_json::Value::Array(Vec::new()));
            continue;
        }
        let uploaded = store.upload(files).await?;
        debug!(field = %field_id, count = uploaded.len(), "uploaded pending files");
        let references: Vec<FileReference> = uploaded.into_iter().map(FileReference::from).collect();
        *value = FieldValue::from_file_references(&references);
    }
    Ok(())
}
