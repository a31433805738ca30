//! Form-state container for one rendered form.
//!
//! Holds the compiled validator, the current values, and the error map.
//! Every edit revalidates the edited field synchronously, so the error map
//! always reflects the latest change before the next frame is drawn.

use flowdesk_types::FieldSchema;
use serde_json::{Map, Value};

use crate::compiler::{CompiledForm, FormErrors, compile_form};
use crate::value::{FieldValue, FormValues};

#[derive(Debug, Clone)]
pub struct FormState {
    fields: Vec<FieldSchema>,
    form: CompiledForm,
    initial: FormValues,
    values: FormValues,
    errors: FormErrors,
}

impl FormState {
    /// Build the state for `fields`, seeded from stored `form_data`.
    pub fn new(fields: Vec<FieldSchema>, initial_data: &Map<String, Value>) -> Self {
        let form = compile_form(&fields);
        let initial = form.defaults(initial_data);
        Self {
            values: initial.clone(),
            fields,
            form,
            initial,
            errors: FormErrors::new(),
        }
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn compiled(&self) -> &CompiledForm {
        &self.form
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, field_id: &str) -> Option<&FieldValue> {
        self.values.get(field_id)
    }

    pub fn error(&self, field_id: &str) -> Option<&str> {
        self.errors.get(field_id).map(String::as_str)
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Replace a field's value and revalidate that field.
    pub fn set_value(&mut self, field_id: &str, value: FieldValue) {
        match self.form.validate_field(field_id, Some(&value)) {
            Ok(_) => {
                self.errors.shift_remove(field_id);
            }
            Err(message) => {
                self.errors.insert(field_id.to_string(), message);
            }
        }
        self.values.insert(field_id.to_string(), value);
    }

    /// True once any value differs from the values the form opened with.
    pub fn is_dirty(&self) -> bool {
        self.values != self.initial
    }

    /// Validate every field. On failure the error map is replaced so every
    /// offending input is marked at once.
    pub fn submit(&mut self) -> Result<FormValues, FormErrors> {
        match self.form.validate(&self.values) {
            Ok(accepted) => {
                self.errors.clear();
                Ok(accepted)
            }
            Err(errors) => {
                self.errors = errors.clone();
                Err(errors)
            }
        }
    }

    /// Current values without validation, for saving a draft.
    pub fn draft_values(&self) -> FormValues {
        self.values.clone()
    }

    /// Discard edits and errors.
    pub fn reset(&mut self) {
        self.values = self.initial.clone();
        self.errors.clear();
    }

    /// Accept the current values as the new baseline, as after a save.
    pub fn mark_saved(&mut self) {
        self.initial = self.values.clone();
    }
}
