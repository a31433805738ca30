//! Schema-to-validator compiler.
//!
//! [`compile_form`] turns a list of field schemas into a [`CompiledForm`]: one
//! rule set per field plus the default value map. Compilation is pure; the
//! same schema list always yields the same acceptance rules.
//!
//! Rules per value shape:
//!
//! - text: must be a string; `min_length`, `max_length` and `pattern` apply
//! - number: numeric strings are coerced, `""` counts as unset; `min`/`max` apply
//! - choice kinds: a non-empty string (numbers are accepted as their text)
//! - multi-choice kinds: a non-empty list of strings
//! - checkbox: a boolean, never empty
//! - temporal kinds: a non-empty string
//! - file: server references or pending local files, non-empty
//! - anything else: accepted as is
//!
//! Empty values (absent, null, `""`, `[]`) are accepted for optional fields
//! and rejected for required ones. Option membership is not enforced; see
//! [`CompiledForm::membership_warnings`].

use flowdesk_types::{FieldKind, FieldSchema};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::kind::{KindSpec, OptionSource, SELECT_MANY_MESSAGE, SELECT_OPTION_MESSAGE, ValueShape, kind_spec};
use crate::value::{FieldValue, FormValues};

/// Default message for required fields without a custom message.
pub const REQUIRED_MESSAGE: &str = "Required";

/// Validation errors keyed by field id, in form order.
pub type FormErrors = IndexMap<String, String>;

/// An accepted choice value that is not one of the field's inline options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipWarning {
    pub field_id: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
struct TextRules {
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    pattern_message: String,
}

#[derive(Debug, Clone, Default)]
struct NumberRules {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Clone)]
struct CompiledField {
    id: String,
    kind: FieldKind,
    spec: KindSpec,
    required: bool,
    required_message: String,
    text: TextRules,
    number: NumberRules,
    options: Vec<String>,
    default_value: Option<Value>,
}

/// Validator for one form, derived from its field schemas.
#[derive(Debug, Clone, Default)]
pub struct CompiledForm {
    fields: Vec<CompiledField>,
}

pub fn compile_form(fields: &[FieldSchema]) -> CompiledForm {
    CompiledForm {
        fields: fields.iter().map(compile_field).collect(),
    }
}

fn compile_field(field: &FieldSchema) -> CompiledField {
    let spec = kind_spec(&field.kind);
    let rules = field.validation.clone().unwrap_or_default();

    let pattern = rules.pattern.as_deref().filter(|source| !source.is_empty()).and_then(|source| match Regex::new(source) {
        Ok(regex) => Some(regex),
        Err(error) => {
            warn!(field = %field.id, pattern = source, error = %error, "ignoring invalid validation pattern");
            None
        }
    });

    CompiledField {
        id: field.id.clone(),
        kind: field.kind.clone(),
        spec,
        required: field.required,
        required_message: field.required_message().unwrap_or(REQUIRED_MESSAGE).to_string(),
        text: TextRules {
            min_length: rules.min_length,
            max_length: rules.max_length,
            pattern,
            pattern_message: rules.custom_message.clone().unwrap_or_else(|| "Invalid format".to_string()),
        },
        number: NumberRules {
            min: rules.min,
            max: rules.max,
        },
        options: field.options().to_vec(),
        default_value: field.default_value.clone(),
    }
}

impl CompiledForm {
    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn kind(&self, field_id: &str) -> Option<&FieldKind> {
        self.field(field_id).map(|field| &field.kind)
    }

    fn field(&self, field_id: &str) -> Option<&CompiledField> {
        self.fields.iter().find(|field| field.id == field_id)
    }

    /// Validate every field. On success the values come back normalised
    /// (numbers coerced, option ids as text) and in form order; values for ids
    /// the form does not know are dropped.
    pub fn validate(&self, values: &FormValues) -> Result<FormValues, FormErrors> {
        let mut accepted = FormValues::new();
        let mut errors = FormErrors::new();
        for field in &self.fields {
            match field.check(values.get(&field.id)) {
                Ok(Some(value)) => {
                    accepted.insert(field.id.clone(), value);
                }
                Ok(None) => {}
                Err(message) => {
                    errors.insert(field.id.clone(), message);
                }
            }
        }
        if errors.is_empty() { Ok(accepted) } else { Err(errors) }
    }

    /// Validate one field. Unknown ids accept anything.
    pub fn validate_field(&self, field_id: &str, value: Option<&FieldValue>) -> Result<Option<FieldValue>, String> {
        match self.field(field_id) {
            Some(field) => field.check(value),
            None => Ok(value.cloned()),
        }
    }

    /// Initial values: stored data, then the authored default, then `false`
    /// for checkboxes and `""` for everything else.
    pub fn defaults(&self, initial: &Map<String, Value>) -> FormValues {
        self.fields
            .iter()
            .map(|field| {
                let value = initial
                    .get(&field.id)
                    .filter(|value| !value.is_null())
                    .or(field.default_value.as_ref())
                    .cloned()
                    .unwrap_or_else(|| match field.spec.shape {
                        ValueShape::Boolean => Value::Bool(false),
                        _ => Value::String(String::new()),
                    });
                (field.id.clone(), FieldValue::Json(value))
            })
            .collect()
    }

    /// Accepted values that are not among their field's inline options.
    pub fn membership_warnings(&self, values: &FormValues) -> Vec<MembershipWarning> {
        let mut warnings = Vec::new();
        for field in self.fields.iter().filter(|field| field.spec.options == OptionSource::Inline) {
            let Some(FieldValue::Json(value)) = values.get(&field.id) else {
                continue;
            };
            let selected: Vec<String> = match value {
                Value::String(text) if !text.is_empty() => vec![text.clone()],
                Value::Array(items) => items.iter().filter_map(|item| item.as_str().map(str::to_string)).collect(),
                _ => Vec::new(),
            };
            for choice in selected {
                if !field.options.contains(&choice) {
                    warnings.push(MembershipWarning {
                        field_id: field.id.clone(),
                        value: choice,
                    });
                }
            }
        }
        warnings
    }
}

impl CompiledField {
    fn check(&self, value: Option<&FieldValue>) -> Result<Option<FieldValue>, String> {
        let Some(value) = value.filter(|value| !value.is_empty()) else {
            if self.required {
                return Err(self.spec.empty_message.unwrap_or(self.required_message.as_str()).to_string());
            }
            return Ok(value.cloned());
        };

        match self.spec.shape {
            ValueShape::Text => self.check_text(value).map(Some),
            ValueShape::Temporal => match value.as_str() {
                Some(_) => Ok(Some(value.clone())),
                None => Err(self.spec.empty_message.unwrap_or("Invalid date").to_string()),
            },
            ValueShape::Number => self.check_number(value).map(Some),
            ValueShape::Boolean => match value.as_json() {
                Some(Value::Bool(_)) => Ok(Some(value.clone())),
                _ => Err("Expected true or false".to_string()),
            },
            ValueShape::Choice => match value.as_json() {
                Some(Value::String(_)) => Ok(Some(value.clone())),
                Some(Value::Number(number)) => Ok(Some(FieldValue::text(number.to_string()))),
                _ => Err(SELECT_OPTION_MESSAGE.to_string()),
            },
            ValueShape::MultiChoice => check_multi_choice(value).map(Some),
            ValueShape::Files => check_files(value).map(Some),
            ValueShape::Any => Ok(Some(value.clone())),
        }
    }

    fn check_text(&self, value: &FieldValue) -> Result<FieldValue, String> {
        let Some(text) = value.as_str() else {
            return Err("Expected text".to_string());
        };
        let length = text.chars().count();
        if let Some(min_length) = self.text.min_length
            && length < min_length
        {
            return Err(format!("Minimum {min_length} characters required"));
        }
        if let Some(max_length) = self.text.max_length
            && length > max_length
        {
            return Err(format!("Maximum {max_length} characters allowed"));
        }
        if let Some(pattern) = &self.text.pattern
            && !pattern.is_match(text)
        {
            return Err(self.text.pattern_message.clone());
        }
        Ok(value.clone())
    }

    fn check_number(&self, value: &FieldValue) -> Result<FieldValue, String> {
        let number = match value.as_json() {
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(text)) => text.trim().parse::<f64>().ok().filter(|number| number.is_finite()),
            _ => None,
        };
        let Some(number) = number else {
            return Err("Expected a number".to_string());
        };
        if let Some(min) = self.number.min
            && number < min
        {
            return Err(format!("Minimum value is {}", format_number(min)));
        }
        if let Some(max) = self.number.max
            && number > max
        {
            return Err(format!("Maximum value is {}", format_number(max)));
        }
        Ok(FieldValue::Json(number_value(number)))
    }
}

fn check_multi_choice(value: &FieldValue) -> Result<FieldValue, String> {
    let Some(Value::Array(items)) = value.as_json() else {
        return Err(SELECT_MANY_MESSAGE.to_string());
    };
    let mut selected = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(text) => selected.push(Value::String(text.clone())),
            Value::Number(number) => selected.push(Value::String(number.to_string())),
            _ => return Err(SELECT_MANY_MESSAGE.to_string()),
        }
    }
    Ok(FieldValue::Json(Value::Array(selected)))
}

fn check_files(value: &FieldValue) -> Result<FieldValue, String> {
    match value {
        FieldValue::LocalFiles(_) => Ok(value.clone()),
        FieldValue::Json(Value::Array(items)) => {
            let well_formed = items.iter().all(|item| {
                item.get("original_name").is_some_and(Value::is_string) && item.get("saved_name").is_some_and(Value::is_string)
            });
            if well_formed { Ok(value.clone()) } else { Err("Please select a file".to_string()) }
        }
        FieldValue::Json(_) => Err("Please select a file".to_string()),
    }
}

/// Integral values print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 { format!("{}", value as i64) } else { value.to_string() }
}

fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        Value::Number(Number::from(value as i64))
    } else {
        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }
}
