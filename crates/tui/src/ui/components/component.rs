//! Component system for the Flowdesk TUI.
//!
//! Components are screens that own only local UI behavior. They read and
//! mutate [`App`] from key handlers and report side effects as [`Effect`]s
//! instead of performing I/O themselves.

use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};

use crate::app::{App, Effect};

/// A screen with its own key handling and rendering.
///
/// # Component Lifecycle
///
/// 1. **Event Handling**: the runtime routes keys for the active route to
///    `handle_key_events()`
/// 2. **Effects**: returned effects run after the handler returns
/// 3. **Rendering**: `render()` draws into the area the layout assigns
pub(crate) trait Component {
    /// Handle a key while this component is active.
    fn handle_key_events(&mut self, _app: &mut App, _key: KeyEvent) -> Vec<Effect> {
        Vec::new()
    }

    /// Render the component into `rect`.
    fn render(&mut self, frame: &mut Frame, rect: Rect, app: &mut App);
}
