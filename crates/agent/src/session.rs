//! Chat session behind an assistant panel.
//!
//! A session owns the visible conversation for one assistant instance,
//! persists it under the instance's storage key, and drives a reply through
//! [`SuggestionParser`]. At most one request is in flight at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

use flowdesk_api::chat::{CHAT_ENDPOINT_ENV, RESOURCE_CHAT_ENDPOINT_ENV, RESOURCE_CHAT_PATH, TEMPLATE_CHAT_PATH, chat_endpoint};
use flowdesk_api::{ApiError, ChatMessage, ChatRole, ChatTransport};
use flowdesk_util::{CHAT_STORAGE_KEY, LocalStore, LocalStoreExt, RESOURCE_CHAT_STORAGE_KEY};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::parser::{Suggestion, SuggestionParser};

/// Reply shown when a request or the stream fails.
pub const ERROR_REPLY: &str = "Sorry, an error occurred while processing your request. Please try again.";
/// Section holding the assistant's reasoning.
pub const THINKING_SECTION: &str = "thinking";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a request is already in flight")]
    Busy,
    #[error("message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Transport(#[from] ApiError),
}

/// Per-instance assistant settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub endpoint: String,
    pub storage_key: String,
    /// Section tags extracted from replies.
    pub sections: Vec<String>,
    /// Send the whole conversation instead of only the new message.
    pub include_history: bool,
}

impl AssistantConfig {
    /// Template suggestions; the endpoint honours `FLOWDESK_CHAT_ENDPOINT`.
    pub fn template() -> Self {
        Self {
            endpoint: chat_endpoint(CHAT_ENDPOINT_ENV, TEMPLATE_CHAT_PATH),
            storage_key: CHAT_STORAGE_KEY.to_string(),
            sections: vec!["template".to_string()],
            include_history: false,
        }
    }

    /// Resource suggestions; the endpoint honours `FLOWDESK_RESOURCE_CHAT_ENDPOINT`.
    pub fn resource() -> Self {
        Self {
            endpoint: chat_endpoint(RESOURCE_CHAT_ENDPOINT_ENV, RESOURCE_CHAT_PATH),
            storage_key: RESOURCE_CHAT_STORAGE_KEY.to_string(),
            sections: vec!["resource".to_string()],
            include_history: false,
        }
    }
}

/// One entry of the visible conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sections: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collapsed_sections: BTreeMap<String, bool>,
}

impl AssistantMessage {
    fn user(content: &str) -> Self {
        Self {
            role: ChatRole::User,
            content: content.to_string(),
            sections: BTreeMap::new(),
            collapsed_sections: BTreeMap::new(),
        }
    }

    fn assistant(section_names: &[String], collapsed: bool) -> Self {
        let names = std::iter::once(THINKING_SECTION.to_string()).chain(section_names.iter().cloned());
        let (sections, collapsed_sections) = names.map(|name| ((name.clone(), String::new()), (name, collapsed))).unzip();
        Self {
            role: ChatRole::Assistant,
            content: String::new(),
            sections,
            collapsed_sections,
        }
    }

    fn error_reply(section_names: &[String]) -> Self {
        let mut message = Self::assistant(section_names, false);
        message.content = ERROR_REPLY.to_string();
        message.sections.insert(THINKING_SECTION.to_string(), ERROR_REPLY.to_string());
        message
    }

    pub fn section(&self, name: &str) -> Option<&str> {
        self.sections.get(name).map(String::as_str).filter(|text| !text.is_empty())
    }

    /// Sections start collapsed until toggled.
    pub fn is_collapsed(&self, name: &str) -> bool {
        self.collapsed_sections.get(name).copied().unwrap_or(true)
    }
}

pub struct ChatSession {
    config: AssistantConfig,
    store: Arc<dyn LocalStore>,
    messages: Vec<AssistantMessage>,
    parser: Option<SuggestionParser>,
    loading: bool,
}

impl ChatSession {
    /// Open a session, restoring the history saved under the storage key.
    pub fn new(config: AssistantConfig, store: Arc<dyn LocalStore>) -> Self {
        let messages = match store.load::<Vec<AssistantMessage>>(&config.storage_key) {
            Ok(messages) => messages.unwrap_or_default(),
            Err(error) => {
                warn!(key = %config.storage_key, %error, "failed to load chat history");
                Vec::new()
            }
        };
        Self {
            config,
            store,
            messages,
            parser: None,
            loading: false,
        }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn messages(&self) -> &[AssistantMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Clear the conversation. Ignored while a request is in flight.
    pub fn new_chat(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.messages.clear();
        if let Err(error) = self.store.remove(&self.config.storage_key) {
            warn!(key = %self.config.storage_key, %error, "failed to clear chat history");
        }
        true
    }

    pub fn toggle_section(&mut self, message_index: usize, section: &str) {
        if let Some(message) = self.messages.get_mut(message_index) {
            let collapsed = message.is_collapsed(section);
            message.collapsed_sections.insert(section.to_string(), !collapsed);
            self.persist();
        }
    }

    /// Record the user's message and mark the session busy. Returns the
    /// messages to send.
    pub fn begin(&mut self, input: &str) -> Result<Vec<ChatMessage>, SessionError> {
        if self.loading {
            return Err(SessionError::Busy);
        }
        let input = input.trim();
        if input.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.messages.push(AssistantMessage::user(input));
        self.loading = true;
        self.persist();

        let outgoing = if self.config.include_history {
            self.messages
                .iter()
                .map(|message| ChatMessage {
                    role: message.role,
                    content: message.content.clone(),
                })
                .collect()
        } else {
            vec![ChatMessage::user(input)]
        };
        Ok(outgoing)
    }

    /// The reply stream opened; add the assistant placeholder.
    pub fn start_reply(&mut self) {
        self.messages.push(AssistantMessage::assistant(&self.config.sections, true));
        self.parser = Some(SuggestionParser::new(self.config.sections.iter().cloned()));
    }

    /// Apply one chunk of the reply. Returns the suggestion once per reply.
    pub fn apply_chunk(&mut self, chunk: &str) -> Option<Suggestion> {
        let parser = self.parser.as_mut()?;
        let suggestion = parser.push(chunk);
        self.sync_reply();
        suggestion
    }

    /// The stream ended normally.
    pub fn complete(&mut self) -> Option<Suggestion> {
        let suggestion = self.parser.as_mut().and_then(SuggestionParser::finish);
        self.sync_reply();
        self.parser = None;
        self.loading = false;
        self.persist();
        suggestion
    }

    /// The request or the stream failed; show the error reply.
    pub fn fail(&mut self, error: &ApiError) {
        error!(endpoint = %self.config.endpoint, %error, "assistant request failed");
        self.sync_reply();
        self.parser = None;
        self.messages.push(AssistantMessage::error_reply(&self.config.sections));
        self.loading = false;
        self.persist();
    }

    /// Send `input` and consume the whole reply. `on_update` runs after
    /// every chunk with the assistant message as it stands.
    pub async fn send(
        &mut self,
        input: &str,
        transport: &dyn ChatTransport,
        mut on_update: impl FnMut(&AssistantMessage),
    ) -> Result<Option<Suggestion>, SessionError> {
        let outgoing = self.begin(input)?;
        let mut stream = match transport.open(&self.config.endpoint, &outgoing).await {
            Ok(stream) => stream,
            Err(error) => {
                self.fail(&error);
                return Err(error.into());
            }
        };
        self.start_reply();

        let mut accepted = None;
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(text) => {
                    if let Some(suggestion) = self.apply_chunk(&text) {
                        accepted = Some(suggestion);
                    }
                    if let Some(message) = self.messages.last() {
                        on_update(message);
                    }
                }
                Err(error) => {
                    self.fail(&error);
                    return Err(error.into());
                }
            }
        }
        if let Some(suggestion) = self.complete() {
            accepted = Some(suggestion);
        }
        debug!(endpoint = %self.config.endpoint, accepted = accepted.is_some(), "assistant reply finished");
        Ok(accepted)
    }

    fn sync_reply(&mut self) {
        let Some(parser) = self.parser.as_ref() else {
            return;
        };
        let Some(message) = self.messages.last_mut().filter(|message| message.role == ChatRole::Assistant) else {
            return;
        };
        message.content = parser.chat().to_string();
        message.sections.insert(THINKING_SECTION.to_string(), parser.thinking().to_string());
        for tag in &self.config.sections {
            let text = parser.section(tag).unwrap_or_default();
            message.sections.insert(tag.clone(), text.trim().to_string());
        }
    }

    fn persist(&self) {
        if let Err(error) = self.store.save(&self.config.storage_key, &self.messages) {
            warn!(key = %self.config.storage_key, %error, "failed to save chat history");
        }
    }
}
