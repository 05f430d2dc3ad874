use crate::error::TranscriptError;
use crate::model::{CodeMessage, CodeOutput, Conversation, Message, MessageGroup};

/// Borrowed view of the last message together with the group that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLocation<'a> {
    pub group: &'a MessageGroup,
    pub message: &'a Message,
}

/// Owned container for the conversation currently open in a chat view.
///
/// All transcript mutation goes through these primitives. Callers hold the
/// store behind whatever sharing primitive their runtime uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptStore {
    chat: Conversation,
    loading: bool,
}

impl TranscriptStore {
    #[must_use]
    pub fn new(chat: Conversation) -> Self {
        Self {
            chat,
            loading: false,
        }
    }

    #[must_use]
    pub fn empty(chat_id: impl Into<String>) -> Self {
        Self::new(Conversation::new(chat_id))
    }

    pub fn chat(&self) -> &Conversation {
        &self.chat
    }

    pub fn chat_id(&self) -> &str {
        &self.chat.id
    }

    /// Replaces the whole conversation, e.g. after loading a stored chat.
    pub fn replace(&mut self, chat: Conversation) {
        self.chat = chat;
    }

    /// Discards the conversation and forgets the chat id.
    pub fn discard(&mut self) {
        self.chat = Conversation::default();
        self.loading = false;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn last_group(&self) -> Result<&MessageGroup, TranscriptError> {
        self.chat
            .message_groups
            .last()
            .ok_or(TranscriptError::NoGroups)
    }

    pub fn last_message(&self) -> Result<MessageLocation<'_>, TranscriptError> {
        let group = self.last_group()?;
        let message = group
            .messages
            .last()
            .ok_or_else(|| TranscriptError::EmptyGroup {
                group_id: group.id.clone(),
            })?;
        Ok(MessageLocation { group, message })
    }

    /// Returns the last message when it is a code message.
    pub fn last_code_message(&self) -> Result<(&MessageGroup, &CodeMessage), TranscriptError> {
        let location = self.last_message()?;
        let code = location
            .message
            .as_code()
            .ok_or_else(|| TranscriptError::NotCodeMessage {
                message_id: location.message.id().to_string(),
            })?;
        Ok((location.group, code))
    }

    pub fn is_last_group_from_user(&self) -> bool {
        self.last_group().is_ok_and(MessageGroup::is_from_user)
    }

    pub fn append_group(&mut self, group: MessageGroup) {
        self.chat.message_groups.push(group);
    }

    /// Appends `message` to the last group.
    pub fn append_message(&mut self, message: Message) -> Result<(), TranscriptError> {
        self.last_group_mut()?.messages.push(message);
        Ok(())
    }

    /// Appends `text` to the content of the last message.
    pub fn append_text_at_the_end(&mut self, text: &str) -> Result<(), TranscriptError> {
        self.last_message_mut()?.push_str(text);
        Ok(())
    }

    /// Removes the last message of the last group.
    pub fn remove_last_message(&mut self) -> Result<Message, TranscriptError> {
        let group = self.last_group_mut()?;
        group
            .messages
            .pop()
            .ok_or_else(|| TranscriptError::EmptyGroup {
                group_id: group.id.clone(),
            })
    }

    /// Starts a fresh output record on the last (code) message.
    pub fn append_empty_output(&mut self) -> Result<(), TranscriptError> {
        self.last_code_message_mut()?.outputs.push(CodeOutput::empty());
        Ok(())
    }

    /// Appends captured execution text to the newest output record.
    pub fn append_output_text(&mut self, text: &str) -> Result<(), TranscriptError> {
        let code = self.last_code_message_mut()?;
        let message_id = code.id.clone();
        let output = code
            .outputs
            .last_mut()
            .ok_or(TranscriptError::NoOutput { message_id })?;
        output.content.push_str(text);
        Ok(())
    }

    fn last_group_mut(&mut self) -> Result<&mut MessageGroup, TranscriptError> {
        self.chat
            .message_groups
            .last_mut()
            .ok_or(TranscriptError::NoGroups)
    }

    fn last_message_mut(&mut self) -> Result<&mut Message, TranscriptError> {
        let group = self.last_group_mut()?;
        let group_id = group.id.clone();
        group
            .messages
            .last_mut()
            .ok_or(TranscriptError::EmptyGroup { group_id })
    }

    fn last_code_message_mut(&mut self) -> Result<&mut CodeMessage, TranscriptError> {
        let message = self.last_message_mut()?;
        let message_id = message.id().to_string();
        message
            .as_code_mut()
            .ok_or(TranscriptError::NotCodeMessage { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::TranscriptStore;
    use crate::error::TranscriptError;
    use crate::model::{CodeLanguage, Message, MessageGroup};

    #[test]
    fn last_message_reports_missing_groups_and_messages() {
        let mut store = TranscriptStore::empty("chat-1");
        assert_eq!(store.last_message().err(), Some(TranscriptError::NoGroups));

        let group = MessageGroup::assistant("coder", None, Vec::new());
        let group_id = group.id.clone();
        store.append_group(group);

        assert_eq!(
            store.last_message().err(),
            Some(TranscriptError::EmptyGroup { group_id })
        );
    }

    #[test]
    fn output_text_requires_code_message_with_output() {
        let mut store = TranscriptStore::empty("chat-1");
        store.append_group(MessageGroup::assistant("coder", None, Vec::new()));
        store
            .append_message(Message::plain("hello"))
            .expect("append plain");

        assert!(matches!(
            store.append_empty_output(),
            Err(TranscriptError::NotCodeMessage { .. })
        ));

        store
            .append_message(Message::code(CodeLanguage::Shell, "ls"))
            .expect("append code");
        assert!(matches!(
            store.append_output_text("a.txt"),
            Err(TranscriptError::NoOutput { .. })
        ));

        store.append_empty_output().expect("append output");
        store.append_output_text("a.txt\n").expect("append text");

        let (_, code) = store.last_code_message().expect("code message");
        assert_eq!(code.outputs.len(), 1);
        assert_eq!(code.outputs[0].content, "a.txt\n");
    }

    #[test]
    fn discard_resets_chat_and_loading() {
        let mut store = TranscriptStore::empty("chat-1");
        store.set_loading(true);
        store.append_group(MessageGroup::user("hi", Vec::new()));

        store.discard();

        assert!(!store.is_loading());
        assert!(store.chat().message_groups.is_empty());
        assert_eq!(store.chat_id(), "");
    }
}
