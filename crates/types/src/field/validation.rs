//! Authoring-time checks for field definitions.
//!
//! These routines run inside the builders before a template or resource type
//! is saved. They never fail hard: every problem is reported as an entry in
//! the returned error map so the builder can show it next to the input.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use super::FieldSchema;

static FIELD_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("field name pattern compiles"));

/// Builder input a definition error is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldErrorKey {
    Label,
    Name,
    Options,
    ResourceType,
    Required,
}

impl fmt::Display for FieldErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            FieldErrorKey::Label => "label",
            FieldErrorKey::Name => "name",
            FieldErrorKey::Options => "options",
            FieldErrorKey::ResourceType => "resource_type",
            FieldErrorKey::Required => "required",
        };
        f.write_str(key)
    }
}

/// Errors for one field definition keyed by the offending input.
pub type FieldDefinitionErrors = BTreeMap<FieldErrorKey, String>;

/// Returns true when `name` is a valid machine key.
pub fn is_valid_field_name(name: &str) -> bool {
    FIELD_NAME_PATTERN.is_match(name)
}

/// Validate one field definition against its siblings.
///
/// `siblings` is the whole collection the field belongs to; the field itself
/// may be part of it and is skipped by id when checking name uniqueness.
pub fn validate_field_definition(field: &FieldSchema, siblings: &[FieldSchema]) -> FieldDefinitionErrors {
    let mut errors = FieldDefinitionErrors::new();

    if field.label.trim().is_empty() {
        errors.insert(FieldErrorKey::Label, "Field label is required".to_string());
    }

    if field.name.trim().is_empty() {
        errors.insert(FieldErrorKey::Name, "Field name is required".to_string());
    } else if !is_valid_field_name(&field.name) {
        errors.insert(FieldErrorKey::Name, "Field name can only contain a-z, A-Z, 0-9, -, _".to_string());
    } else if siblings.iter().any(|other| other.id != field.id && other.name == field.name) {
        errors.insert(FieldErrorKey::Name, "Field name must be unique".to_string());
    }

    if field.kind.requires_options() {
        let options = field.options();
        if options.is_empty() || options.iter().any(|option| option.trim().is_empty()) {
            errors.insert(FieldErrorKey::Options, "All options must have a value".to_string());
        }
    }

    if field.kind.is_resource_bound() && field.resource_type_id.is_none() {
        errors.insert(FieldErrorKey::ResourceType, "Resource type is required".to_string());
    }

    if field.required && field.label.trim().is_empty() {
        errors.insert(FieldErrorKey::Required, "Required field must have a label".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;

    fn text_field(id: &str, name: &str) -> FieldSchema {
        let mut field = FieldSchema::new(id, name, FieldKind::Text);
        field.label = "Label".into();
        field
    }

    #[test]
    fn accepts_a_complete_definition() {
        let field = text_field("f1", "hostname");
        assert!(validate_field_definition(&field, std::slice::from_ref(&field)).is_empty());
    }

    #[test]
    fn flags_names_with_spaces_or_punctuation() {
        for bad in ["host name", "host.name", "host!", "názov"] {
            let field = text_field("f1", bad);
            let errors = validate_field_definition(&field, &[]);
            assert!(errors.contains_key(&FieldErrorKey::Name), "{bad} should be rejected");
        }
    }

    #[test]
    fn flags_duplicate_names_among_siblings() {
        let first = text_field("f1", "owner");
        let second = text_field("f2", "owner");
        let siblings = vec![first.clone(), second.clone()];
        let errors = validate_field_definition(&second, &siblings);
        assert_eq!(errors.get(&FieldErrorKey::Name).map(String::as_str), Some("Field name must be unique"));
    }

    #[test]
    fn select_requires_non_blank_options() {
        let mut field = FieldSchema::new("f1", "color", FieldKind::Select);
        field.label = "Color".into();
        assert!(validate_field_definition(&field, &[]).contains_key(&FieldErrorKey::Options));

        field.options = Some(vec!["red".into(), "blue".into()]);
        assert!(validate_field_definition(&field, &[]).is_empty());

        field.options = Some(Vec::new());
        assert!(validate_field_definition(&field, &[]).contains_key(&FieldErrorKey::Options));
    }

    #[test]
    fn resource_fields_need_a_type() {
        let mut field = FieldSchema::new("f1", "server", FieldKind::ResourceMulti);
        field.label = "Server".into();
        assert!(validate_field_definition(&field, &[]).contains_key(&FieldErrorKey::ResourceType));
        field.resource_type_id = Some(3);
        assert!(validate_field_definition(&field, &[]).is_empty());
    }

    #[test]
    fn required_field_without_label_reports_both_keys() {
        let mut field = FieldSchema::new("f1", "notes", FieldKind::Textarea);
        field.required = true;
        let errors = validate_field_definition(&field, &[]);
        assert!(errors.contains_key(&FieldErrorKey::Label));
        assert!(errors.contains_key(&FieldErrorKey::Required));
    }
}
