//! Authoring state for templates, resource types, and their field lists.
//!
//! Builders never raise validation failures as errors. They keep an error map
//! keyed by the offending input and refuse to produce a saveable value while
//! it is non-empty.

pub mod form;
pub mod notifications;
pub mod resource;
pub mod template;

pub use form::{FieldCheck, FormBuilder};
pub use notifications::{NotificationRules, RuleEdit};
pub use resource::{ResourceBuilder, ResourceErrorKey, ResourceErrors};
pub use template::{TemplateBuilder, TemplateErrorKey, TemplateErrors, normalize_field};
