//! UI components: template list, step form, graph, and assistant chat.

pub mod assistant;
pub mod common;
pub mod component;
pub mod field;
pub mod form;
pub mod graph;
pub mod templates;

pub use assistant::AssistantComponent;
pub(crate) use component::Component;
pub use form::StepFormComponent;
pub use templates::TemplatesComponent;
