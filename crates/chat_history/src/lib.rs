//! File-backed chat history: one JSON document per conversation.

mod error;
mod paths;
mod schema;
mod store;

pub use error::ChatHistoryError;
pub use paths::{chat_file_name, history_root, validate_chat_id};
pub use schema::{ChatRecord, CHAT_RECORD_VERSION};
pub use store::ChatHistoryStore;
