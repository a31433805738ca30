//! Theme styling for the TUI.
//!
//! One palette ships with the client. `TUI_THEME` is read so existing setups
//! keep working, but any name other than the built-in one falls back to it.

use std::env;

use tracing::debug;

pub mod helpers;
pub mod palette;
pub mod roles;

pub use palette::FlowdeskTheme;
pub use roles::Theme;

pub const THEME_ENV: &str = "TUI_THEME";
const BUILT_IN: &str = "flowdesk";

/// Resolve the theme to draw with.
pub fn load() -> Box<dyn Theme> {
    if let Ok(name) = env::var(THEME_ENV) {
        let name = name.trim();
        if !name.is_empty() && !name.eq_ignore_ascii_case(BUILT_IN) {
            debug!(theme = %name, "unknown theme requested; using the built-in palette");
        }
    }
    Box::new(FlowdeskTheme::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_theme_names_fall_back_to_the_built_in_palette() {
        temp_env::with_var(THEME_ENV, Some("dracula"), || {
            let theme = load();
            assert_eq!(theme.roles().focus, palette::CYAN);
        });
    }
}
