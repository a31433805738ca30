//! # Flowdesk Agent
//!
//! Client side of the template and resource assistants: an incremental
//! parser that splits a streamed reply into reasoning, chat text and a tagged
//! JSON suggestion, and a session that sends messages, keeps the
//! conversation and persists it per assistant instance.

pub mod parser;
pub mod session;

pub use parser::{Suggestion, SuggestionParser};
pub use session::{AssistantConfig, AssistantMessage, ChatSession, ERROR_REPLY, SessionError, THINKING_SECTION};
