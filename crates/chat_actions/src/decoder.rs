use chat_transcript::{Message, TranscriptError, TranscriptStore};
use console_api::StreamEvent;

use crate::error::ActionError;

/// Applies assistant stream events to the transcript.
///
/// Tracks whether the most recent message is complete. A fresh decoder
/// starts complete, so the first text opens a new plain message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnDecoder {
    message_done: bool,
}

impl Default for TurnDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self { message_done: true }
    }

    pub fn is_message_done(&self) -> bool {
        self.message_done
    }

    pub fn apply(
        &mut self,
        store: &mut TranscriptStore,
        event: StreamEvent,
    ) -> Result<(), ActionError> {
        match event {
            StreamEvent::StartCode(language) => {
                store.append_message(Message::code(language, ""))?;
                self.message_done = false;
            }
            StreamEvent::EndCode => {
                if self.message_done {
                    return Err(ActionError::MalformedStream(
                        "end of code block without an open message".to_string(),
                    ));
                }
                self.message_done = true;
            }
            StreamEvent::Clear => {
                match store.remove_last_message() {
                    Ok(_) | Err(TranscriptError::EmptyGroup { .. }) => {}
                    Err(error) => return Err(error.into()),
                }
                self.message_done = true;
            }
            StreamEvent::Text(text) => {
                if self.message_done {
                    store.append_message(Message::plain(""))?;
                    self.message_done = false;
                }
                store.append_text_at_the_end(&text)?;
            }
        }

        Ok(())
    }

    pub fn apply_all(
        &mut self,
        store: &mut TranscriptStore,
        events: impl IntoIterator<Item = StreamEvent>,
    ) -> Result<(), ActionError> {
        for event in events {
            self.apply(store, event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chat_transcript::{CodeLanguage, MessageGroup, TranscriptStore};
    use console_api::StreamEvent;

    use super::TurnDecoder;
    use crate::error::ActionError;

    fn store_with_assistant_group() -> TranscriptStore {
        let mut store = TranscriptStore::empty("chat-1");
        store.append_group(MessageGroup::assistant("coder", None, Vec::new()));
        store
    }

    #[test]
    fn text_after_code_block_opens_new_plain_message() {
        let mut store = store_with_assistant_group();
        let mut decoder = TurnDecoder::new();

        decoder
            .apply_all(
                &mut store,
                vec![
                    StreamEvent::StartCode(CodeLanguage::Shell),
                    StreamEvent::Text("ls".to_string()),
                    StreamEvent::EndCode,
                    StreamEvent::Text("done".to_string()),
                ],
            )
            .expect("well-formed stream");

        let messages = &store.last_group().expect("group").messages;
        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_code());
        assert_eq!(messages[0].content(), "ls");
        assert!(!messages[1].is_code());
        assert_eq!(messages[1].content(), "done");
        assert!(!decoder.is_message_done());
    }

    #[test]
    fn end_code_requires_open_message() {
        let mut store = store_with_assistant_group();
        let mut decoder = TurnDecoder::new();

        let error = decoder
            .apply(&mut store, StreamEvent::EndCode)
            .expect_err("end without open message");
        assert!(matches!(error, ActionError::MalformedStream(_)));
    }

    #[test]
    fn clear_on_empty_group_only_resets_mode() {
        let mut store = store_with_assistant_group();
        let mut decoder = TurnDecoder::new();

        decoder
            .apply(&mut store, StreamEvent::Clear)
            .expect("clear on empty group");

        assert!(decoder.is_message_done());
        assert!(store.last_group().expect("group").messages.is_empty());
    }

    #[test]
    fn events_without_group_are_invalid_state() {
        let mut store = TranscriptStore::empty("chat-1");
        let mut decoder = TurnDecoder::new();

        let error = decoder
            .apply(&mut store, StreamEvent::Text("hi".to_string()))
            .expect_err("no group to write into");
        assert!(matches!(error, ActionError::InvalidState(_)));
    }
}
