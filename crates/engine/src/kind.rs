//! Shared handler table for field kinds.
//!
//! The compiler and the renderers both dispatch through [`kind_spec`], so a
//! kind cannot be supported by one side and forgotten by the other.

use flowdesk_types::FieldKind;

/// Shape a field's value must have once it is non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Free text with length and pattern rules.
    Text,
    /// Date, time, or date-time strings; no text rules apply.
    Temporal,
    /// Number or numeric string.
    Number,
    Boolean,
    /// One selected option value.
    Choice,
    /// A list of selected option values.
    MultiChoice,
    /// Uploaded file references or pending local files.
    Files,
    /// Unrecognised kinds accept anything.
    Any,
}

/// Input control used to edit a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    TextInput,
    TextArea,
    NumberInput,
    Dropdown,
    MultiSelect,
    RadioGroup,
    Checkbox,
    DateInput,
    TimeInput,
    DateTimeInput,
    FileDrop,
    Freeform,
}

/// Where a kind's options come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    None,
    /// Authored inline on the field.
    Inline,
    /// Entries of the bound resource type, fetched at runtime.
    Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSpec {
    pub shape: ValueShape,
    pub control: Control,
    pub options: OptionSource,
    /// Message reported when the value is empty and the field is required.
    /// `None` means the field's own required message is used.
    pub empty_message: Option<&'static str>,
}

impl KindSpec {
    const fn new(shape: ValueShape, control: Control, options: OptionSource, empty_message: Option<&'static str>) -> Self {
        Self {
            shape,
            control,
            options,
            empty_message,
        }
    }

    /// True for kinds that hold several values.
    pub fn is_multi(&self) -> bool {
        matches!(self.shape, ValueShape::MultiChoice | ValueShape::Files)
    }
}

pub const SELECT_OPTION_MESSAGE: &str = "Please select an option";
pub const SELECT_MANY_MESSAGE: &str = "Please select at least one option";

pub fn kind_spec(kind: &FieldKind) -> KindSpec {
    use Control as C;
    use OptionSource as O;
    use ValueShape as S;

    match kind {
        FieldKind::Text => KindSpec::new(S::Text, C::TextInput, O::None, None),
        FieldKind::Textarea => KindSpec::new(S::Text, C::TextArea, O::None, None),
        FieldKind::Number => KindSpec::new(S::Number, C::NumberInput, O::None, None),
        FieldKind::Select => KindSpec::new(S::Choice, C::Dropdown, O::Inline, Some(SELECT_OPTION_MESSAGE)),
        FieldKind::Multiselect => KindSpec::new(S::MultiChoice, C::MultiSelect, O::Inline, Some(SELECT_MANY_MESSAGE)),
        FieldKind::Radio => KindSpec::new(S::Choice, C::RadioGroup, O::Inline, Some(SELECT_OPTION_MESSAGE)),
        FieldKind::Checkbox => KindSpec::new(S::Boolean, C::Checkbox, O::None, None),
        FieldKind::Date => KindSpec::new(S::Temporal, C::DateInput, O::None, Some("Please select a date")),
        FieldKind::Time => KindSpec::new(S::Temporal, C::TimeInput, O::None, Some("Please select a time")),
        FieldKind::Datetime => KindSpec::new(S::Temporal, C::DateTimeInput, O::None, Some("Please select a date and time")),
        FieldKind::File => KindSpec::new(S::Files, C::FileDrop, O::None, Some("Please select a file")),
        FieldKind::Resource => KindSpec::new(S::Choice, C::Dropdown, O::Resource, Some(SELECT_OPTION_MESSAGE)),
        FieldKind::ResourceMulti => KindSpec::new(S::MultiChoice, C::MultiSelect, O::Resource, Some(SELECT_MANY_MESSAGE)),
        FieldKind::Other(_) => KindSpec::new(S::Any, C::Freeform, O::None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_authorable_kind_has_a_concrete_control() {
        for kind in FieldKind::AUTHORABLE.iter() {
            assert_ne!(kind_spec(kind).control, Control::Freeform, "{kind} falls through to freeform");
        }
        assert_eq!(kind_spec(&FieldKind::Other("rating".into())).shape, ValueShape::Any);
    }

    #[test]
    fn option_sources_follow_field_kind_helpers() {
        for kind in FieldKind::AUTHORABLE.iter() {
            let spec = kind_spec(kind);
            assert_eq!(spec.options == OptionSource::Inline, kind.uses_options(), "{kind}");
            assert_eq!(spec.options == OptionSource::Resource, kind.is_resource_bound(), "{kind}");
        }
    }
}
