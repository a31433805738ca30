//! Runtime form values.
//!
//! Most values are plain JSON. File fields in local mode hold handles to files
//! on this machine until they are uploaded, which JSON cannot represent, so
//! they get their own variant.

use flowdesk_types::{FileReference, LocalFile};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Json(Value),
    LocalFiles(Vec<LocalFile>),
}

/// Values keyed by field id, in form order.
pub type FormValues = IndexMap<String, FieldValue>;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("field '{field_id}' still holds {count} local file(s) that must be uploaded first")]
pub struct PendingUploadError {
    pub field_id: String,
    pub count: usize,
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Json(Value::String(value.into()))
    }

    pub fn empty_text() -> Self {
        FieldValue::Json(Value::String(String::new()))
    }

    /// Absent-equivalent values: null, "", [], or no local files.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Json(Value::Null) => true,
            FieldValue::Json(Value::String(text)) => text.is_empty(),
            FieldValue::Json(Value::Array(items)) => items.is_empty(),
            FieldValue::Json(_) => false,
            FieldValue::LocalFiles(files) => files.is_empty(),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            FieldValue::Json(value) => Some(value),
            FieldValue::LocalFiles(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Value::as_str)
    }

    /// Server file references held by this value, skipping malformed entries.
    pub fn file_references(&self) -> Vec<FileReference> {
        match self {
            FieldValue::Json(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value::<FileReference>(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn from_file_references(references: &[FileReference]) -> Self {
        FieldValue::Json(Value::Array(
            references
                .iter()
                .map(|reference| {
                    serde_json::json!({
                        "original_name": reference.original_name,
                        "saved_name": reference.saved_name,
                    })
                })
                .collect(),
        ))
    }

    /// Render the value for read-only display.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Json(Value::Null) => String::new(),
            FieldValue::Json(Value::String(text)) => text.clone(),
            FieldValue::Json(Value::Bool(flag)) => if *flag { "Yes" } else { "No" }.to_string(),
            FieldValue::Json(Value::Array(items)) => items.iter().map(display_item).collect::<Vec<_>>().join(", "),
            FieldValue::Json(other) => other.to_string(),
            FieldValue::LocalFiles(files) => files.iter().map(|file| file.name.as_str()).collect::<Vec<_>>().join(", "),
        }
    }
}

fn display_item(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("original_name") {
            Some(Value::String(name)) => name.clone(),
            _ => item.to_string(),
        },
        other => other.to_string(),
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Json(value)
    }
}

/// Convert form values into the JSON object stored as `form_data`.
pub fn to_json_map(values: &FormValues) -> Result<Map<String, Value>, PendingUploadError> {
    let mut map = Map::new();
    for (field_id, value) in values {
        match value {
            FieldValue::Json(json) => {
                map.insert(field_id.clone(), json.clone());
            }
            FieldValue::LocalFiles(files) if files.is_empty() => {
                map.insert(field_id.clone(), Value::Array(Vec::new()));
            }
            FieldValue::LocalFiles(files) => {
                return Err(PendingUploadError {
                    field_id: field_id.clone(),
                    count: files.len(),
                });
            }
        }
    }
    Ok(map)
}

/// Lift a stored `form_data` object into form values.
pub fn from_json_map(map: &Map<String, Value>) -> FormValues {
    map.iter().map(|(key, value)| (key.clone(), FieldValue::Json(value.clone()))).collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;

    #[test]
    fn emptiness_covers_every_absent_shape() {
        assert!(FieldValue::Json(Value::Null).is_empty());
        assert!(FieldValue::empty_text().is_empty());
        assert!(FieldValue::Json(json!([])).is_empty());
        assert!(FieldValue::LocalFiles(Vec::new()).is_empty());
        assert!(!FieldValue::Json(json!(false)).is_empty());
        assert!(!FieldValue::Json(json!(0)).is_empty());
    }

    #[test]
    fn pending_local_files_block_json_conversion() {
        let mut values = FormValues::new();
        values.insert("title".into(), FieldValue::text("Laptop"));
        values.insert(
            "receipt".into(),
            FieldValue::LocalFiles(vec![LocalFile {
                path: PathBuf::from("/tmp/receipt.pdf"),
                name: "receipt.pdf".into(),
                size: 10,
            }]),
        );
        let error = to_json_map(&values).expect_err("local files are not serialisable");
        assert_eq!(error.field_id, "receipt");

        values.shift_remove("receipt");
        let map = to_json_map(&values).expect("json");
        assert_eq!(map.get("title"), Some(&json!("Laptop")));
    }

    #[test]
    fn display_joins_lists_and_file_names() {
        let files = FieldValue::Json(json!([{"original_name": "a.png", "saved_name": "1.png"}, {"original_name": "b.pdf", "saved_name": "2.pdf"}]));
        assert_eq!(files.display(), "a.png, b.pdf");
        assert_eq!(files.file_references().len(), 2);
        assert_eq!(FieldValue::Json(json!(true)).display(), "Yes");
        assert_eq!(FieldValue::Json(json!(["x", "y"])).display(), "x, y");
    }
}
