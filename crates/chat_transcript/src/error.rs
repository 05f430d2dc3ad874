use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("conversation has no message groups")]
    NoGroups,

    #[error("last message group '{group_id}' has no messages")]
    EmptyGroup { group_id: String },

    #[error("last message '{message_id}' is not a code message")]
    NotCodeMessage { message_id: String },

    #[error("code message '{message_id}' has no output record")]
    NoOutput { message_id: String },
}
