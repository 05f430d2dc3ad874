use std::sync::OnceLock;

use chat_transcript::CodeLanguage;
use regex::Regex;

use crate::utf8::Utf8ChunkDecoder;

pub const END_CODE_TOKEN: &str = "<<<< END CODE >>>>";
pub const CLEAR_TOKEN: &str = "<<<< CLEAR >>>>";

/// Returns the wire token that opens a code block in `language`.
#[must_use]
pub fn start_code_token(language: CodeLanguage) -> String {
    format!("<<<< START CODE ({language}) >>>>")
}

/// Lexical unit of the assistant stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    StartCode(CodeLanguage),
    EndCode,
    Clear,
    Text(String),
}

struct TokenRegistry {
    pattern: Regex,
    tokens: Vec<(String, StreamEvent)>,
    max_token_len: usize,
}

impl TokenRegistry {
    fn event_for(&self, token: &str) -> Option<StreamEvent> {
        self.tokens
            .iter()
            .find(|(candidate, _)| candidate == token)
            .map(|(_, event)| event.clone())
    }

    fn is_proper_prefix(&self, text: &str) -> bool {
        self.tokens
            .iter()
            .any(|(token, _)| token.len() > text.len() && token.starts_with(text))
    }
}

fn registry() -> &'static TokenRegistry {
    static CACHED: OnceLock<TokenRegistry> = OnceLock::new();
    CACHED.get_or_init(|| {
        let mut tokens: Vec<(String, StreamEvent)> = CodeLanguage::ALL
            .into_iter()
            .map(|language| (start_code_token(language), StreamEvent::StartCode(language)))
            .collect();
        tokens.push((END_CODE_TOKEN.to_owned(), StreamEvent::EndCode));
        tokens.push((CLEAR_TOKEN.to_owned(), StreamEvent::Clear));

        let alternatives = tokens
            .iter()
            .map(|(token, _)| regex::escape(token))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&alternatives).expect("control token regex must compile");
        let max_token_len = tokens.iter().map(|(token, _)| token.len()).max().unwrap_or(0);

        TokenRegistry {
            pattern,
            tokens,
            max_token_len,
        }
    })
}

/// Incremental splitter for the token-delimited assistant stream.
///
/// Bytes are decoded with [`Utf8ChunkDecoder`]; any trailing text that could
/// still grow into a control token is held back until the next chunk (or
/// [`TokenSplitter::finish`]) decides it.
#[derive(Debug, Default)]
pub struct TokenSplitter {
    decoder: Utf8ChunkDecoder,
    carry: String,
}

impl TokenSplitter {
    /// Feed one raw chunk and drain every event that is already decided.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let decoded = self.decoder.decode(bytes);
        self.carry.push_str(&decoded);

        let text = std::mem::take(&mut self.carry);
        let held_from = partial_token_start(&text);
        let (ready, held) = text.split_at(held_from);
        self.carry = held.to_owned();

        split_segments(ready)
    }

    /// Flush held text at end of stream.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut text = std::mem::take(&mut self.carry);
        text.push_str(&self.decoder.finish());
        split_segments(&text)
    }

    /// Split a complete payload in one shot.
    pub fn split_all(input: &str) -> Vec<StreamEvent> {
        let mut splitter = Self::default();
        let mut events = splitter.feed(input.as_bytes());
        events.extend(splitter.finish());
        events
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.carry.is_empty() && !self.decoder.has_pending()
    }
}

/// Index of the earliest suffix of `text` that is a proper prefix of a token.
fn partial_token_start(text: &str) -> usize {
    let registry = registry();
    let window_start = text.len().saturating_sub(registry.max_token_len.saturating_sub(1));

    (window_start..text.len())
        .filter(|index| text.is_char_boundary(*index))
        .find(|index| registry.is_proper_prefix(&text[*index..]))
        .unwrap_or(text.len())
}

fn split_segments(text: &str) -> Vec<StreamEvent> {
    let registry = registry();
    let mut events = Vec::new();
    let mut cursor = 0;

    for found in registry.pattern.find_iter(text) {
        if found.start() > cursor {
            events.push(StreamEvent::Text(text[cursor..found.start()].to_owned()));
        }
        if let Some(event) = registry.event_for(found.as_str()) {
            events.push(event);
        }
        cursor = found.end();
    }

    if cursor < text.len() {
        events.push(StreamEvent::Text(text[cursor..].to_owned()));
    }

    events
}
