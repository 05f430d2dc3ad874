//! Conversation transcript model shared by the chat action runtime.
//!
//! This crate defines only the transcript data model and its mutation
//! primitives. It excludes transport, persistence, and stream decoding.
//!
//! Lookups of the "last group" and "last message" return explicit
//! [`TranscriptError`] values instead of panicking on empty conversations.

mod error;
mod model;
mod store;

pub use error::TranscriptError;
pub use model::{
    new_id, CodeLanguage, CodeMessage, CodeOutput, Conversation, Message, MessageGroup,
    PlainMessage, Role, USER_AGENT_ID,
};
pub use store::{MessageLocation, TranscriptStore};
