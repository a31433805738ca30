use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use flowdesk_api::{ApiError, FileStore, UploadedFile};
use flowdesk_engine::files::{DELETE_ERROR, FileUploadState, UPLOAD_ERROR, UploadMode, upload_pending};
use flowdesk_engine::{FieldValue, FormValues};
use flowdesk_types::LocalFile;
use serde_json::json;

#[derive(Default)]
struct FakeStore {
    uploads: Mutex<Vec<Vec<String>>>,
    deletes: Mutex<Vec<String>>,
    fail_uploads: bool,
    fail_deletes: bool,
}

#[async_trait]
impl FileStore for FakeStore {
    async fn upload(&self, files: &[LocalFile]) -> Result<Vec<UploadedFile>, ApiError> {
        if self.fail_uploads {
            return Err(ApiError::Config("storage offline".into()));
        }
        let names: Vec<String> = files.iter().map(|file| file.name.clone()).collect();
        let mut uploads = self.uploads.lock().expect("uploads lock");
        let batch = uploads.len();
        uploads.push(names.clone());
        Ok(names
            .into_iter()
            .enumerate()
            .map(|(index, name)| UploadedFile {
                saved_name: format!("{batch}-{index}-{name}"),
                original_name: name,
                content_type: "application/octet-stream".into(),
                size: 1,
            })
            .collect())
    }

    async fn delete(&self, saved_name: &str) -> Result<(), ApiError> {
        if self.fail_deletes {
            return Err(ApiError::Config("storage offline".into()));
        }
        self.deletes.lock().expect("deletes lock").push(saved_name.to_string());
        Ok(())
    }
}

fn local(name: &str) -> LocalFile {
    LocalFile {
        path: PathBuf::from(format!("/tmp/{name}")),
        name: name.to_string(),
        size: 1,
    }
}

#[tokio::test]
async fn server_mode_uploads_on_drop_and_deletes_exactly_one_entry() {
    let store = FakeStore::default();
    let mut state = FileUploadState::new(UploadMode::Server);

    state.drop_files(vec![local("a.png"), local("b.pdf")], &store).await.expect("upload");
    state.drop_files(vec![local("c.txt")], &store).await.expect("upload");
    assert_eq!(store.uploads.lock().expect("lock").len(), 2);
    assert_eq!(
        state.value(),
        FieldValue::Json(json!([
            {"original_name": "a.png", "saved_name": "0-0-a.png"},
            {"original_name": "b.pdf", "saved_name": "0-1-b.pdf"},
            {"original_name": "c.txt", "saved_name": "1-0-c.txt"},
        ]))
    );

    state.delete(1, &store).await.expect("delete");
    assert_eq!(store.deletes.lock().expect("lock").as_slice(), ["0-1-b.pdf".to_string()]);
    let names: Vec<String> = state.entries().iter().map(|entry| entry.name().to_string()).collect();
    assert_eq!(names, vec!["a.png", "c.txt"]);
    assert!(state.error().is_none());
}

#[tokio::test]
async fn server_failures_keep_previous_value_and_set_error() {
    let existing = FieldValue::Json(json!([{"original_name": "a.png", "saved_name": "s-a.png"}]));

    let failing_upload = FakeStore {
        fail_uploads: true,
        ..FakeStore::default()
    };
    let mut state = FileUploadState::from_value(UploadMode::Server, Some(&existing));
    assert!(state.drop_files(vec![local("b.png")], &failing_upload).await.is_err());
    assert_eq!(state.error(), Some(UPLOAD_ERROR));
    assert_eq!(state.value(), existing);
    assert!(!state.is_uploading());

    let failing_delete = FakeStore {
        fail_deletes: true,
        ..FakeStore::default()
    };
    assert!(state.delete(0, &failing_delete).await.is_err());
    assert_eq!(state.error(), Some(DELETE_ERROR));
    assert_eq!(state.entries().len(), 1);
}

#[tokio::test]
async fn local_mode_defers_uploads_until_the_form_is_saved() {
    let store = FakeStore::default();
    let mut state = FileUploadState::new(UploadMode::Local);
    state.drop_files(vec![local("receipt.pdf")], &store).await.expect("drop");
    state.delete(5, &store).await.expect("out of range is ignored");
    assert!(store.uploads.lock().expect("lock").is_empty());

    let mut values = FormValues::new();
    values.insert("receipt".into(), state.value());
    values.insert("empty".into(), FieldValue::LocalFiles(Vec::new()));
    values.insert("title".into(), FieldValue::text("Trip"));

    upload_pending(&mut values, &store).await.expect("upload pending");
    assert_eq!(values["receipt"], FieldValue::Json(json!([{"original_name": "receipt.pdf", "saved_name": "0-0-receipt.pdf"}])));
    assert_eq!(values["empty"], FieldValue::Json(json!([])));
    assert_eq!(values["title"], FieldValue::text("Trip"));
    assert_eq!(store.uploads.lock().expect("lock").len(), 1);
}
