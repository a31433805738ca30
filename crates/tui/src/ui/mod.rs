//! UI rendering for the TUI: components, the top-level view, the runtime
//! loop, and themes.

pub mod components;
pub mod main_component;
pub mod runtime;
pub mod theme;
