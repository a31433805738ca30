//! Incremental parser for assistant replies.
//!
//! A reply is free text laid out as
//!
//! ```text
//! <think>reasoning...</think>chat message<template>
//! {"name": "..."}
//! </template>
//! ```
//!
//! Chunks arrive split on arbitrary boundaries, markers included. The parser
//! walks the stream once: it routes text to the sink of the current phase,
//! holds back a tail that could be the start of a marker, and tries to read
//! the tagged payload as JSON only when a chunk could have completed it.

use serde_json::Value;
use tracing::debug;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Payload pulled out of a tagged section.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// Tag the payload was found under, e.g. `template`.
    pub section: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Thinking,
    Chat,
    /// Inside the section with this index.
    Section(usize),
    /// The section with this index was closed.
    Done(usize),
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Skip,
    ToChat,
    OpenSection(usize),
    CloseSection(usize),
}

#[derive(Debug, Clone)]
struct Section {
    tag: String,
    open: String,
    close: String,
    body: String,
}

/// Parser for one assistant message.
#[derive(Debug, Clone)]
pub struct SuggestionParser {
    phase: Phase,
    carry: String,
    thinking: String,
    chat: String,
    sections: Vec<Section>,
    data_found: bool,
}

impl SuggestionParser {
    /// Parser extracting the given section tags (`"template"`, `"resource"`).
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sections = tags
            .into_iter()
            .map(Into::into)
            .map(|tag| Section {
                open: format!("<{tag}>"),
                close: format!("</{tag}>"),
                tag,
                body: String::new(),
            })
            .collect();
        Self {
            phase: Phase::Thinking,
            carry: String::new(),
            thinking: String::new(),
            chat: String::new(),
            sections,
            data_found: false,
        }
    }

    /// Feed one chunk. Returns the suggestion the first time a section's
    /// payload parses; later chunks never report it again.
    pub fn push(&mut self, chunk: &str) -> Option<Suggestion> {
        self.carry.push_str(chunk);
        let closed = self.advance(false);
        if closed || chunk.contains('}') { self.try_accept() } else { None }
    }

    /// Flush any held-back text once the stream has ended.
    pub fn finish(&mut self) -> Option<Suggestion> {
        let closed = self.advance(true);
        if closed || !self.data_found { self.try_accept() } else { None }
    }

    pub fn thinking(&self) -> &str {
        self.thinking.trim()
    }

    pub fn chat(&self) -> &str {
        self.chat.trim()
    }

    /// Raw text received so far inside `tag`.
    pub fn section(&self, tag: &str) -> Option<&str> {
        self.sections.iter().find(|section| section.tag == tag).map(|section| section.body.as_str())
    }

    /// Tag of the section currently open or last closed.
    pub fn active_section(&self) -> Option<&str> {
        match self.phase {
            Phase::Section(index) | Phase::Done(index) => Some(self.sections[index].tag.as_str()),
            Phase::Thinking | Phase::Chat => None,
        }
    }

    pub fn data_found(&self) -> bool {
        self.data_found
    }

    fn markers(&self) -> Vec<(&str, Transition)> {
        let opening = || self.sections.iter().enumerate().map(|(index, section)| (section.open.as_str(), Transition::OpenSection(index)));
        match self.phase {
            Phase::Thinking => {
                let think: [(&str, Transition); 2] = [(THINK_OPEN, Transition::Skip), (THINK_CLOSE, Transition::ToChat)];
                think.into_iter().chain(opening()).collect()
            }
            Phase::Chat => opening().collect(),
            Phase::Section(index) => vec![(self.sections[index].close.as_str(), Transition::CloseSection(index))],
            Phase::Done(_) => Vec::new(),
        }
    }

    /// Route buffered text through the phases. Returns true when a section
    /// closed during this call.
    fn advance(&mut self, flush: bool) -> bool {
        let mut closed = false;
        loop {
            let markers = self.markers();
            let earliest = markers
                .iter()
                .filter_map(|(marker, transition)| self.carry.find(marker).map(|position| (position, marker.len(), *transition)))
                .min_by_key(|(position, _, _)| *position);

            let Some((position, marker_len, transition)) = earliest else {
                let keep = if flush {
                    0
                } else {
                    markers.iter().map(|(marker, _)| partial_marker_len(&self.carry, marker)).max().unwrap_or(0)
                };
                let split = self.carry.len() - keep;
                let text: String = self.carry.drain(..split).collect();
                self.append(&text);
                return closed;
            };

            let text: String = self.carry.drain(..position).collect();
            self.append(&text);
            self.carry.drain(..marker_len);
            match transition {
                Transition::Skip => {}
                Transition::ToChat => self.phase = Phase::Chat,
                Transition::OpenSection(index) => {
                    debug!(section = %self.sections[index].tag, "assistant section opened");
                    self.phase = Phase::Section(index);
                }
                Transition::CloseSection(index) => {
                    self.phase = Phase::Done(index);
                    closed = true;
                }
            }
        }
    }

    fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.phase {
            Phase::Thinking => self.thinking.push_str(text),
            Phase::Chat | Phase::Done(_) => self.chat.push_str(text),
            Phase::Section(index) => self.sections[index].body.push_str(text),
        }
    }

    fn try_accept(&mut self) -> Option<Suggestion> {
        if self.data_found {
            return None;
        }
        let index = match self.phase {
            Phase::Section(index) | Phase::Done(index) => index,
            Phase::Thinking | Phase::Chat => return None,
        };
        let section = &self.sections[index];
        let payload = first_json_object(&section.body)?;
        let tag = section.tag.clone();
        debug!(section = %tag, "assistant suggestion parsed");
        self.data_found = true;
        Some(Suggestion { section: tag, payload })
    }
}

/// Parse the leading JSON value of `body`, ignoring whatever trails it.
fn first_json_object(body: &str) -> Option<Value> {
    let mut values = serde_json::Deserializer::from_str(body).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `marker`.
fn partial_marker_len(text: &str, marker: &str) -> usize {
    (1..marker.len()).rev().find(|&len| text.ends_with(&marker[..len])).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn feed(parser: &mut SuggestionParser, chunks: &[&str]) -> Vec<(usize, Suggestion)> {
        chunks
            .iter()
            .enumerate()
            .filter_map(|(index, chunk)| parser.push(chunk).map(|suggestion| (index, suggestion)))
            .collect()
    }

    #[test]
    fn splits_thinking_chat_and_template_across_chunks() {
        let mut parser = SuggestionParser::new(["template"]);
        let accepted = feed(
            &mut parser,
            &["<think>ana", "lyzing</think>Here is", " a plan<template>\n{\"name\":\"T1\"", ",\"fields\":[]}\n</template>"],
        );

        assert_eq!(parser.thinking(), "analyzing");
        assert_eq!(parser.chat(), "Here is a plan");
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].0, 3);
        assert_eq!(accepted[0].1.section, "template");
        assert_eq!(accepted[0].1.payload, json!({"name": "T1", "fields": []}));
        assert!(parser.finish().is_none());
    }

    #[test]
    fn markers_split_between_chunks_are_recognised() {
        let mut parser = SuggestionParser::new(["resource"]);
        let accepted = feed(&mut parser, &["<thi", "nk>plan</th", "ink>ok<reso", "urce>\n{\"name\": \"Server\"}\n</resou", "rce>\nbye"]);
        assert_eq!(parser.thinking(), "plan");
        assert_eq!(parser.chat(), "ok\nbye");
        assert_eq!(accepted.len(), 1);
        assert_eq!(parser.section("resource").map(str::trim), Some("{\"name\": \"Server\"}"));
    }

    #[test]
    fn section_without_think_close_leaves_everything_as_thinking() {
        let mut parser = SuggestionParser::new(["template"]);
        parser.push("<think>still reasoning <template>\n{\"name\": \"A\"}");
        assert_eq!(parser.thinking(), "still reasoning");
        assert_eq!(parser.chat(), "");
        assert_eq!(parser.active_section(), Some("template"));
        assert!(parser.data_found());
    }

    #[test]
    fn malformed_payload_is_ignored() {
        let mut parser = SuggestionParser::new(["template"]);
        let accepted = feed(&mut parser, &["</think>hi<template>\n{\"name\": }\n</template>"]);
        assert!(accepted.is_empty());
        assert!(parser.finish().is_none());
        assert!(!parser.data_found());
    }

    #[test]
    fn plain_text_without_markers_is_thinking() {
        let mut parser = SuggestionParser::new(["template"]);
        parser.push("just text <");
        assert_eq!(parser.thinking(), "just text");
        parser.finish();
        assert_eq!(parser.thinking(), "just text <");
    }
}
