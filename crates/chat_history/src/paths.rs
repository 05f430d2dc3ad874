use std::path::{Path, PathBuf};

use crate::error::ChatHistoryError;

pub const HISTORY_DIR: [&str; 2] = [".aic", "history"];

#[must_use]
pub fn history_root(project_dir: &Path) -> PathBuf {
    project_dir.join(HISTORY_DIR[0]).join(HISTORY_DIR[1])
}

/// Chat ids become file names, so they must be a single plain path segment.
pub fn validate_chat_id(chat_id: &str) -> Result<(), ChatHistoryError> {
    let reason = if chat_id.trim().is_empty() {
        Some("must not be empty")
    } else if chat_id == "." || chat_id == ".." {
        Some("must not be a relative path component")
    } else if chat_id
        .chars()
        .any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control())
    {
        Some("must not contain path separators or control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ChatHistoryError::InvalidChatId {
            chat_id: chat_id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[must_use]
pub fn chat_file_name(chat_id: &str) -> String {
    format!("{chat_id}.json")
}
