//! Typed endpoint helpers, one module per backend resource.
//!
//! Each module adds an `impl FlowdeskClient` block; callers never build paths
//! by hand.

pub mod files;
pub mod preferences;
pub mod resources;
pub mod roles;
pub mod templates;
pub mod tickets;
pub mod users;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped when a value is spliced into a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'#').add(b'%').add(b'/').add(b'<').add(b'>').add(b'?').add(b'`').add(b'{').add(b'}');

pub(crate) fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}
