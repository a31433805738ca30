//! Entry form for a resource type.

use flowdesk_types::{ResourceEntry, ResourceEntryCreate, ResourceType};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::compiler::FormErrors;
use crate::form_state::FormState;
use crate::value::{PendingUploadError, to_json_map};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryFormError {
    #[error("resource type '{0}' has not been saved yet")]
    UnsavedType(String),
    #[error("{} field(s) need attention", .0.len())]
    Invalid(FormErrors),
    #[error(transparent)]
    PendingUpload(#[from] PendingUploadError),
}

/// Form state for creating or editing one entry of a resource type.
#[derive(Debug, Clone)]
pub struct ResourceEntryForm {
    resource_type_id: Option<i64>,
    type_name: String,
    entry_id: Option<i64>,
    state: FormState,
}

impl ResourceEntryForm {
    pub fn new(resource_type: &ResourceType) -> Self {
        Self::with_data(resource_type, None, &Map::new())
    }

    /// Edit an existing entry.
    pub fn for_entry(resource_type: &ResourceType, entry: &ResourceEntry) -> Self {
        Self::with_data(resource_type, entry.id, &entry.data)
    }

    fn with_data(resource_type: &ResourceType, entry_id: Option<i64>, data: &Map<String, Value>) -> Self {
        Self {
            resource_type_id: resource_type.id,
            type_name: resource_type.name.clone(),
            entry_id,
            state: FormState::new(resource_type.fields.clone(), data),
        }
    }

    pub fn entry_id(&self) -> Option<i64> {
        self.entry_id
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    /// Validate and produce the payload to store.
    pub fn submit(&mut self) -> Result<ResourceEntryCreate, EntryFormError> {
        let resource_type_id = self.resource_type_id.ok_or_else(|| EntryFormError::UnsavedType(self.type_name.clone()))?;
        let accepted = self.state.submit().map_err(EntryFormError::Invalid)?;
        let data = to_json_map(&accepted)?;
        Ok(ResourceEntryCreate { resource_type_id, data })
    }
}

#[cfg(test)]
mod tests {
    use flowdesk_types::{FieldKind, FieldSchema};
    use serde_json::json;

    use super::*;
    use crate::value::FieldValue;

    fn server_type() -> ResourceType {
        let mut hostname = FieldSchema::new("hostname", "hostname", FieldKind::Text);
        hostname.label = "Hostname".into();
        hostname.required = true;
        let mut cores = FieldSchema::new("cores", "cores", FieldKind::Number);
        cores.label = "Cores".into();
        ResourceType {
            id: Some(2),
            name: "Server".into(),
            fields: vec![hostname, cores],
            ..ResourceType::default()
        }
    }

    #[test]
    fn submit_produces_entry_payload() {
        let mut form = ResourceEntryForm::new(&server_type());
        let errors = match form.submit() {
            Err(EntryFormError::Invalid(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        };
        assert!(errors.contains_key("hostname"));

        form.state_mut().set_value("hostname", FieldValue::text("db-01"));
        form.state_mut().set_value("cores", FieldValue::text("8"));
        let payload = form.submit().expect("payload");
        assert_eq!(payload.resource_type_id, 2);
        assert_eq!(payload.data.get("hostname"), Some(&json!("db-01")));
        assert_eq!(payload.data.get("cores"), Some(&json!(8)));
    }

    #[test]
    fn editing_seeds_from_entry_data() {
        let entry: ResourceEntry = serde_json::from_value(json!({"id": 5, "resource_type_id": 2, "data": {"hostname": "web-1"}})).expect("entry");
        let form = ResourceEntryForm::for_entry(&server_type(), &entry);
        assert_eq!(form.entry_id(), Some(5));
        assert_eq!(form.state().value("hostname").and_then(|value| value.as_str()), Some("web-1"));
    }
}
