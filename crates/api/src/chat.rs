//! Streaming chat endpoint.
//!
//! The assistant endpoints answer a `POST {messages}` with a chunked plain
//! text body. Chunks are split on arbitrary byte boundaries, so the stream is
//! decoded through [`Utf8ChunkDecoder`] before it reaches the parser.

use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ApiError, FlowdeskClient};

/// Chat path used by the template assistant.
pub const TEMPLATE_CHAT_PATH: &str = "/ai/template-suggest";
/// Chat path used by the resource assistant.
pub const RESOURCE_CHAT_PATH: &str = "/ai/resource-suggest";
/// Environment variable overriding the template assistant's chat path.
pub const CHAT_ENDPOINT_ENV: &str = "FLOWDESK_CHAT_ENDPOINT";
/// Environment variable overriding the resource assistant's chat path.
pub const RESOURCE_CHAT_ENDPOINT_ENV: &str = "FLOWDESK_RESOURCE_CHAT_ENDPOINT";

/// Text chunks of one assistant reply.
pub type ChatStream = BoxStream<'static, Result<String, ApiError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
}

/// Resolve a chat path: a non-blank `env_key` wins over `fallback`.
pub fn chat_endpoint(env_key: &str, fallback: &str) -> String {
    std::env::var(env_key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

impl FlowdeskClient {
    /// Open a streaming reply for `messages`. The returned stream ends when the
    /// server closes the body and yields an error if the read fails midway.
    pub async fn open_chat(&self, endpoint: &str, messages: &[ChatMessage]) -> Result<ChatStream, ApiError> {
        let request = self
            .request(Method::POST, endpoint)
            .header(reqwest::header::ACCEPT, "text/plain")
            .json(&ChatRequest { messages });
        let response = self.send(request).await?;
        debug!(endpoint, "chat stream opened");

        let mut decoder = Utf8ChunkDecoder::default();
        let stream = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => Ok(decoder.decode(&bytes)),
                Err(error) => Err(ApiError::from(error)),
            })
            .filter(|chunk| futures_util::future::ready(!matches!(chunk, Ok(text) if text.is_empty())));
        Ok(stream.boxed())
    }
}

/// Incremental UTF-8 decoder that holds back a trailing partial sequence until
/// the next chunk completes it.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn decode(&mut self, chunk: &Bytes) -> String {
        self.pending.extend_from_slice(chunk);
        let valid_up_to = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            Err(error) => match error.error_len() {
                // Incomplete sequence at the end: keep it for the next chunk.
                None => error.valid_up_to(),
                // Invalid bytes: decode lossily rather than stalling the stream.
                Some(_) => self.pending.len(),
            },
        };
        let rest = self.pending.split_off(valid_up_to);
        let decoded = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = rest;
        decoded
    }

    /// Bytes still held back waiting for completion.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_joins_split_multibyte_characters() {
        let text = "naïve ✓";
        let bytes = text.as_bytes();
        let split = text.find('✓').expect("check mark") + 1;

        let mut decoder = Utf8ChunkDecoder::default();
        let first = decoder.decode(&Bytes::copy_from_slice(&bytes[..split]));
        assert_eq!(first, "naïve ");
        assert_eq!(decoder.pending_len(), 1);
        let second = decoder.decode(&Bytes::copy_from_slice(&bytes[split..]));
        assert_eq!(format!("{first}{second}"), text);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8ChunkDecoder::default();
        assert_eq!(decoder.decode(&Bytes::from_static(b"ok\xffok")), "ok\u{fffd}ok");
    }

    #[test]
    fn chat_endpoint_prefers_environment() {
        temp_env::with_var(CHAT_ENDPOINT_ENV, Some("/ai/custom"), || {
            assert_eq!(chat_endpoint(CHAT_ENDPOINT_ENV, TEMPLATE_CHAT_PATH), "/ai/custom");
        });
        temp_env::with_var(CHAT_ENDPOINT_ENV, Some("  "), || {
            assert_eq!(chat_endpoint(CHAT_ENDPOINT_ENV, TEMPLATE_CHAT_PATH), TEMPLATE_CHAT_PATH);
        });
    }

    #[test]
    fn each_assistant_has_its_own_override() {
        temp_env::with_vars(
            [(CHAT_ENDPOINT_ENV, Some("/ai/custom")), (RESOURCE_CHAT_ENDPOINT_ENV, Some("/ai/resources-v2"))],
            || {
                assert_eq!(chat_endpoint(RESOURCE_CHAT_ENDPOINT_ENV, RESOURCE_CHAT_PATH), "/ai/resources-v2");
            },
        );
        temp_env::with_vars([(CHAT_ENDPOINT_ENV, Some("/ai/custom")), (RESOURCE_CHAT_ENDPOINT_ENV, None)], || {
            assert_eq!(chat_endpoint(RESOURCE_CHAT_ENDPOINT_ENV, RESOURCE_CHAT_PATH), RESOURCE_CHAT_PATH);
        });
    }

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let body = serde_json::to_value(ChatRequest {
            messages: &[ChatMessage::user("hi")],
        })
        .expect("serialize");
        assert_eq!(body, serde_json::json!({"messages": [{"role": "user", "content": "hi"}]}));
    }
}
