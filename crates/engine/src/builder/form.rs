//! Field list editor used for step forms and resource types.

use chrono::Utc;
use flowdesk_types::{FieldDefinitionErrors, FieldKind, FieldSchema, validate_field_definition};
use indexmap::IndexMap;
use tracing::debug;

/// Validation state of one field definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCheck {
    /// Not edited since it was added or loaded.
    Unvalidated,
    Valid,
    Invalid(FieldDefinitionErrors),
}

impl FieldCheck {
    pub fn has_errors(&self) -> bool {
        matches!(self, FieldCheck::Invalid(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormBuilder {
    fields: Vec<FieldSchema>,
    checks: IndexMap<String, FieldCheck>,
}

impl FormBuilder {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        let checks = fields.iter().map(|field| (field.id.clone(), FieldCheck::Unvalidated)).collect();
        Self { fields, checks }
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<FieldSchema> {
        self.fields
    }

    pub fn field(&self, field_id: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.id == field_id)
    }

    pub fn check(&self, field_id: &str) -> &FieldCheck {
        self.checks.get(field_id).unwrap_or(&FieldCheck::Unvalidated)
    }

    /// Errors for one field, empty unless it failed its last check.
    pub fn errors(&self, field_id: &str) -> FieldDefinitionErrors {
        match self.check(field_id) {
            FieldCheck::Invalid(errors) => errors.clone(),
            _ => FieldDefinitionErrors::new(),
        }
    }

    /// True while any field failed its last check. Gates the parent's save.
    pub fn has_errors(&self) -> bool {
        self.checks.values().any(FieldCheck::has_errors)
    }

    /// Append a blank field of `kind` and return its id.
    pub fn add_field(&mut self, kind: FieldKind) -> String {
        let mut stamp = Utc::now().timestamp_millis();
        while self.fields.iter().any(|field| field.id == format!("field-{stamp}") || field.name == format!("field_{stamp}")) {
            stamp += 1;
        }
        let field = FieldSchema::new(format!("field-{stamp}"), format!("field_{stamp}"), kind);
        let id = field.id.clone();
        debug!(field_id = %id, kind = %field.kind, "adding form field");
        self.checks.insert(id.clone(), FieldCheck::Unvalidated);
        self.fields.push(field);
        id
    }

    pub fn remove_field(&mut self, field_id: &str) -> Option<FieldSchema> {
        let index = self.fields.iter().position(|field| field.id == field_id)?;
        self.checks.shift_remove(field_id);
        let removed = self.fields.remove(index);
        self.recheck_validated();
        Some(removed)
    }

    pub fn move_field(&mut self, from: usize, to: usize) -> bool {
        if from >= self.fields.len() || to >= self.fields.len() {
            return false;
        }
        let field = self.fields.remove(from);
        self.fields.insert(to, field);
        true
    }

    /// Apply an edit to one field and revalidate it. Fields checked earlier
    /// are rechecked too, since a rename can clear or cause a duplicate.
    pub fn update_field(&mut self, field_id: &str, edit: impl FnOnce(&mut FieldSchema)) -> bool {
        let Some(field) = self.fields.iter_mut().find(|field| field.id == field_id) else {
            return false;
        };
        edit(field);
        self.checks.insert(field_id.to_string(), FieldCheck::Valid);
        self.recheck_validated();
        true
    }

    pub fn add_option(&mut self, field_id: &str) -> bool {
        self.edit_options(field_id, |options| options.push(String::new()))
    }

    pub fn update_option(&mut self, field_id: &str, index: usize, value: impl Into<String>) -> bool {
        let value = value.into();
        self.edit_options(field_id, |options| {
            if let Some(option) = options.get_mut(index) {
                *option = value;
            }
        })
    }

    pub fn remove_option(&mut self, field_id: &str, index: usize) -> bool {
        self.edit_options(field_id, |options| {
            if index < options.len() {
                options.remove(index);
            }
        })
    }

    /// Check every field, including ones never edited.
    pub fn validate_all(&mut self) -> bool {
        for field in &self.fields {
            let errors = validate_field_definition(field, &self.fields);
            self.checks.insert(field.id.clone(), check_from(errors));
        }
        !self.has_errors()
    }

    fn edit_options(&mut self, field_id: &str, edit: impl FnOnce(&mut Vec<String>)) -> bool {
        let has_options = self.field(field_id).is_some_and(|field| field.options.is_some());
        has_options
            && self.update_field(field_id, |field| {
                if let Some(options) = field.options.as_mut() {
                    edit(options);
                }
            })
    }

    fn recheck_validated(&mut self) {
        for field in &self.fields {
            if let Some(check) = self.checks.get_mut(&field.id)
                && *check != FieldCheck::Unvalidated
            {
                *check = check_from(validate_field_definition(field, &self.fields));
            }
        }
    }
}

fn check_from(errors: FieldDefinitionErrors) -> FieldCheck {
    if errors.is_empty() { FieldCheck::Valid } else { FieldCheck::Invalid(errors) }
}

#[cfg(test)]
mod tests {
    use flowdesk_types::FieldErrorKey;

    use super::*;

    #[test]
    fn new_fields_start_unvalidated_with_unique_keys() {
        let mut builder = FormBuilder::default();
        let first = builder.add_field(FieldKind::Text);
        let second = builder.add_field(FieldKind::Select);
        assert_ne!(first, second);
        assert!(first.starts_with("field-"));
        assert_eq!(builder.check(&first), &FieldCheck::Unvalidated);
        assert!(!builder.has_errors());

        let select = builder.field(&second).expect("select");
        assert_eq!(select.options(), &[String::new()]);
        assert!(select.name.starts_with("field_"));
    }

    #[test]
    fn edits_revalidate_and_bubble_up() {
        let mut builder = FormBuilder::default();
        let id = builder.add_field(FieldKind::Text);

        builder.update_field(&id, |field| field.name = "bad name".into());
        let errors = builder.errors(&id);
        assert_eq!(errors.get(&FieldErrorKey::Name).map(String::as_str), Some("Field name can only contain a-z, A-Z, 0-9, -, _"));
        assert!(errors.contains_key(&FieldErrorKey::Label));
        assert!(builder.has_errors());

        builder.update_field(&id, |field| {
            field.name = "title".into();
            field.label = "Title".into();
        });
        assert_eq!(builder.check(&id), &FieldCheck::Valid);
        assert!(!builder.has_errors());
    }

    #[test]
    fn renaming_away_from_a_duplicate_clears_both_fields() {
        let mut builder = FormBuilder::default();
        let first = builder.add_field(FieldKind::Text);
        let second = builder.add_field(FieldKind::Text);
        builder.update_field(&first, |field| {
            field.name = "email".into();
            field.label = "Email".into();
        });
        builder.update_field(&second, |field| {
            field.name = "email".into();
            field.label = "Backup email".into();
        });
        assert!(builder.check(&first).has_errors());
        assert!(builder.check(&second).has_errors());

        builder.update_field(&second, |field| field.name = "backup_email".into());
        assert!(!builder.has_errors());
    }

    #[test]
    fn option_edits_require_an_option_list() {
        let mut builder = FormBuilder::default();
        let select = builder.add_field(FieldKind::Select);
        let text = builder.add_field(FieldKind::Text);

        assert!(builder.add_option(&select));
        assert!(builder.update_option(&select, 0, "Small"));
        assert!(builder.update_option(&select, 1, "Large"));
        assert!(builder.remove_option(&select, 0));
        assert_eq!(builder.field(&select).expect("select").options(), &["Large".to_string()]);
        assert!(!builder.add_option(&text));
    }

    #[test]
    fn validate_all_flags_untouched_fields() {
        let mut builder = FormBuilder::default();
        let id = builder.add_field(FieldKind::Resource);
        assert!(!builder.validate_all());
        let errors = builder.errors(&id);
        assert!(errors.contains_key(&FieldErrorKey::ResourceType));

        builder.remove_field(&id);
        assert!(!builder.has_errors());
        assert!(builder.fields().is_empty());
    }
}
