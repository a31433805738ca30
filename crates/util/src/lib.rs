//! Flowdesk utility functions: persisted local state, paths, timestamps, and
//! text helpers shared by the CLI and the TUI.

pub mod date_handling;
pub mod local_store;
pub mod path_processing;
pub mod text_processing;

pub use date_handling::{format_timestamp, iso_timestamp, parse_timestamp};
pub use local_store::{
    AUTH_STORAGE_KEY, CHAT_STORAGE_KEY, InMemoryLocalStore, JsonLocalStore, LocalStore, LocalStoreExt, PERMISSIONS_STORAGE_KEY,
    RESOURCE_CHAT_STORAGE_KEY, STATE_PATH_ENV, StoreError, default_state_path,
};
pub use path_processing::expand_tilde;
pub use text_processing::{fuzzy_score, redact_sensitive, truncate_to_width};
