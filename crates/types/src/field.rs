//! Field schema definitions shared by templates, workflow steps, and resource types.
//!
//! A [`FieldSchema`] describes one form input: its kind, validation rules,
//! options, and layout hints. Field schemas never exist on their own; they are
//! owned by a workflow step form or a resource type and are serialized as part
//! of their parent.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

pub mod validation;

pub use validation::{FieldDefinitionErrors, FieldErrorKey, validate_field_definition};

/// Closed set of input kinds understood by the compiler and the renderer.
///
/// Unknown kinds are preserved verbatim in [`FieldKind::Other`] so that
/// payloads authored elsewhere survive a round trip; they accept any value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Select,
    Multiselect,
    Radio,
    Checkbox,
    Date,
    Time,
    Datetime,
    File,
    Resource,
    ResourceMulti,
    Other(String),
}

impl FieldKind {
    /// Kinds offered by the form builder palette, in display order.
    pub const AUTHORABLE: [FieldKind; 11] = [
        FieldKind::Text,
        FieldKind::Textarea,
        FieldKind::Number,
        FieldKind::Select,
        FieldKind::Multiselect,
        FieldKind::Radio,
        FieldKind::Checkbox,
        FieldKind::Date,
        FieldKind::File,
        FieldKind::Resource,
        FieldKind::ResourceMulti,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Number => "number",
            FieldKind::Select => "select",
            FieldKind::Multiselect => "multiselect",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Date => "date",
            FieldKind::Time => "time",
            FieldKind::Datetime => "datetime",
            FieldKind::File => "file",
            FieldKind::Resource => "resource",
            FieldKind::ResourceMulti => "resource_multi",
            FieldKind::Other(raw) => raw.as_str(),
        }
    }

    /// Human readable name used by builder palettes.
    pub fn display_name(&self) -> &str {
        match self {
            FieldKind::Text => "Text Input",
            FieldKind::Textarea => "Text Area",
            FieldKind::Number => "Number Input",
            FieldKind::Select => "Dropdown",
            FieldKind::Multiselect => "Multi Select",
            FieldKind::Radio => "Radio Group",
            FieldKind::Checkbox => "Checkbox",
            FieldKind::Date => "Date Picker",
            FieldKind::Time => "Time Picker",
            FieldKind::Datetime => "Date & Time Picker",
            FieldKind::File => "File Upload",
            FieldKind::Resource => "Resource Select",
            FieldKind::ResourceMulti => "Resource Multi Select",
            FieldKind::Other(raw) => raw.as_str(),
        }
    }

    /// Kinds whose option list is authored inline and must be non-empty.
    pub fn requires_options(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Multiselect)
    }

    /// Kinds that render an inline option list (select, multiselect, radio).
    pub fn uses_options(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Multiselect | FieldKind::Radio)
    }

    /// Kinds bound to the entries of a resource type.
    pub fn is_resource_bound(&self) -> bool {
        matches!(self, FieldKind::Resource | FieldKind::ResourceMulti)
    }
}

impl From<String> for FieldKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => FieldKind::Text,
            "textarea" => FieldKind::Textarea,
            "number" => FieldKind::Number,
            "select" => FieldKind::Select,
            "multiselect" => FieldKind::Multiselect,
            "radio" => FieldKind::Radio,
            "checkbox" => FieldKind::Checkbox,
            "date" => FieldKind::Date,
            "time" => FieldKind::Time,
            "datetime" => FieldKind::Datetime,
            "file" => FieldKind::File,
            "resource" => FieldKind::Resource,
            "resource_multi" => FieldKind::ResourceMulti,
            _ => FieldKind::Other(value),
        }
    }
}

impl From<FieldKind> for String {
    fn from(value: FieldKind) -> Self {
        match value {
            FieldKind::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layout width hint for a field inside its form grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldWidth {
    #[default]
    #[serde(rename = "full")]
    Full,
    #[serde(rename = "1/2")]
    Half,
    #[serde(rename = "1/3")]
    Third,
    #[serde(rename = "1/4")]
    Quarter,
}

impl FieldWidth {
    pub const ALL: [FieldWidth; 4] = [FieldWidth::Full, FieldWidth::Half, FieldWidth::Third, FieldWidth::Quarter];

    /// Number of columns a row holds when filled with fields of this width.
    pub fn columns(self) -> u16 {
        match self {
            FieldWidth::Full => 1,
            FieldWidth::Half => 2,
            FieldWidth::Third => 3,
            FieldWidth::Quarter => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldWidth::Full => "Full Width",
            FieldWidth::Half => "Half Width",
            FieldWidth::Third => "One Third",
            FieldWidth::Quarter => "One Quarter",
        }
    }
}

/// Optional validation constraints attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Minimum numeric value. Accepts numbers or numeric strings on input.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub min: Option<f64>,
    /// Maximum numeric value. Accepts numbers or numeric strings on input.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_number")]
    pub max: Option<f64>,
    /// Regular expression source applied to text values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Message surfaced for pattern mismatches and missing required values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
    /// Accepted file extensions for file fields on resource types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_types: Option<Vec<String>>,
    /// Maximum file size in bytes for file fields on resource types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

impl FieldValidation {
    pub fn is_empty(&self) -> bool {
        *self == FieldValidation::default()
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match raw {
        Some(JsonValue::Number(number)) => number.as_f64(),
        Some(JsonValue::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Describes one form input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Stable binding key, unique within the owning collection.
    pub id: String,
    /// Machine key; `[A-Za-z0-9_-]+`, unique among siblings.
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, deserialize_with = "crate::workflow::null_as_empty")]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    /// Inline options for select, multiselect, and radio fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, deserialize_with = "crate::workflow::null_as_empty")]
    pub width: FieldWidth,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<JsonValue>,
    /// Resource type whose entries populate the option list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type_id: Option<i64>,
    /// Entry data key shown as the option label; falls back to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_display_field: Option<String>,
}

impl FieldSchema {
    /// Builds a blank field of the given kind, as the form builder does when a
    /// palette entry is chosen.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: FieldKind) -> Self {
        let options = if kind.uses_options() { Some(vec![String::new()]) } else { None };
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            label: String::new(),
            required: false,
            options,
            width: FieldWidth::Full,
            validation: Some(FieldValidation::default()),
            placeholder: Some(String::new()),
            help_text: Some(String::new()),
            default_value: None,
            resource_type_id: None,
            resource_display_field: None,
        }
    }

    /// Options as a slice, empty when none were authored.
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }

    /// Returns the data key used for resource entry labels.
    pub fn display_key(&self) -> &str {
        self.resource_display_field.as_deref().filter(|key| !key.is_empty()).unwrap_or("id")
    }

    /// Message shown when a required value is missing.
    pub fn required_message(&self) -> Option<&str> {
        self.validation.as_ref().and_then(|rules| rules.custom_message.as_deref())
    }

    /// Label with a trailing marker for required fields.
    pub fn decorated_label(&self) -> String {
        let label = if self.label.trim().is_empty() { self.name.as_str() } else { self.label.as_str() };
        if self.required { format!("{label} *") } else { label.to_string() }
    }
}

/// Server-side reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileReference {
    pub original_name: String,
    pub saved_name: String,
}

impl FileReference {
    /// True when the original name carries an image extension.
    pub fn is_image(&self) -> bool {
        const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];
        self.extension()
            .map(|extension| IMAGE_EXTENSIONS.contains(&extension.as_str()))
            .unwrap_or(false)
    }

    /// Lowercased file extension of the original name.
    pub fn extension(&self) -> Option<String> {
        let (_, extension) = self.original_name.rsplit_once('.')?;
        Some(extension.to_ascii_lowercase())
    }
}

/// File picked on this machine but not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalFile {
    pub path: std::path::PathBuf,
    /// File name shown in lists and sent as the multipart file name.
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

impl LocalFile {
    /// Builds a local file handle from a path, using its final component as the name.
    pub fn from_path(path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        let size = std::fs::metadata(&path).map(|metadata| metadata.len()).unwrap_or(0);
        Self { path, name, size }
    }
}
