use chat_transcript::Conversation;
use serde::{Deserialize, Serialize};

pub const CHAT_RECORD_VERSION: u32 = 1;

/// On-disk envelope around one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatRecord {
    pub version: u32,
    pub saved_at: String,
    pub chat: Conversation,
}

impl ChatRecord {
    #[must_use]
    pub fn v1(saved_at: impl Into<String>, chat: Conversation) -> Self {
        Self {
            version: CHAT_RECORD_VERSION,
            saved_at: saved_at.into(),
            chat,
        }
    }
}
