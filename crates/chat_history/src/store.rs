use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chat_transcript::{new_id, Conversation, Message};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::ChatHistoryError;
use crate::paths::{chat_file_name, validate_chat_id};
use crate::schema::{ChatRecord, CHAT_RECORD_VERSION};

/// Directory of chat records, one `<chat_id>.json` file per conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistoryStore {
    root: PathBuf,
}

impl ChatHistoryStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chat_path(&self, chat_id: &str) -> Result<PathBuf, ChatHistoryError> {
        validate_chat_id(chat_id)?;
        Ok(self.root.join(chat_file_name(chat_id)))
    }

    /// Writes `chat` atomically: a sibling temp file is renamed over the record.
    pub fn save(&self, chat: &Conversation) -> Result<PathBuf, ChatHistoryError> {
        let path = self.chat_path(&chat.id)?;
        fs::create_dir_all(&self.root).map_err(|source| {
            ChatHistoryError::io("creating history directory", &self.root, source)
        })?;

        let record = ChatRecord::v1(now_rfc3339()?, chat.clone());
        let encoded = serde_json::to_vec_pretty(&record)
            .map_err(|source| ChatHistoryError::json_serialize(&path, source))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, encoded)
            .map_err(|source| ChatHistoryError::io("writing chat record", &temp_path, source))?;
        fs::rename(&temp_path, &path)
            .map_err(|source| ChatHistoryError::io("replacing chat record", &path, source))?;

        tracing::debug!(chat_id = %chat.id, path = %path.display(), "chat saved");
        Ok(path)
    }

    pub fn load(&self, chat_id: &str) -> Result<Conversation, ChatHistoryError> {
        let path = self.chat_path(chat_id)?;
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                return Err(ChatHistoryError::ChatNotFound {
                    root: self.root.clone(),
                    chat_id: chat_id.to_string(),
                });
            }
            Err(source) => {
                return Err(ChatHistoryError::io("reading chat record", &path, source));
            }
        };

        let record = serde_json::from_slice::<ChatRecord>(&raw)
            .map_err(|source| ChatHistoryError::json_parse(&path, source))?;
        validate_record(&path, chat_id, &record)?;
        Ok(record.chat)
    }

    /// Loads a chat, starting an empty conversation when none is stored yet.
    pub fn load_or_empty(&self, chat_id: &str) -> Result<Conversation, ChatHistoryError> {
        match self.load(chat_id) {
            Ok(chat) => Ok(chat),
            Err(error) if error.is_not_found() => Ok(Conversation::new(chat_id)),
            Err(error) => Err(error),
        }
    }

    /// Duplicates a stored chat under `target_id` with fresh group, message
    /// and output ids, and saves the copy.
    pub fn copy(&self, source_id: &str, target_id: &str) -> Result<Conversation, ChatHistoryError> {
        validate_chat_id(target_id)?;
        let mut chat = self.load(source_id)?;
        chat.id = target_id.to_string();

        for group in &mut chat.message_groups {
            group.id = new_id();
            for message in &mut group.messages {
                match message {
                    Message::Plain(plain) => plain.id = new_id(),
                    Message::Code(code) => {
                        code.id = new_id();
                        for output in &mut code.outputs {
                            output.id = new_id();
                        }
                    }
                }
            }
        }

        self.save(&chat)?;
        Ok(chat)
    }

    pub fn delete(&self, chat_id: &str) -> Result<(), ChatHistoryError> {
        let path = self.chat_path(chat_id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == ErrorKind::NotFound => {
                Err(ChatHistoryError::ChatNotFound {
                    root: self.root.clone(),
                    chat_id: chat_id.to_string(),
                })
            }
            Err(source) => Err(ChatHistoryError::io("deleting chat record", &path, source)),
        }
    }

    /// Returns stored chat ids in lexical order.
    pub fn chat_ids(&self) -> Result<Vec<String>, ChatHistoryError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ChatHistoryError::io(
                    "listing history directory",
                    &self.root,
                    source,
                ));
            }
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| {
                ChatHistoryError::io("listing history directory", &self.root, source)
            })?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(chat_id) = name.strip_suffix(".json") {
                if validate_chat_id(chat_id).is_ok() {
                    ids.push(chat_id.to_string());
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

fn validate_record(
    path: &Path,
    chat_id: &str,
    record: &ChatRecord,
) -> Result<(), ChatHistoryError> {
    if record.version != CHAT_RECORD_VERSION {
        return Err(ChatHistoryError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: record.version,
        });
    }

    if OffsetDateTime::parse(&record.saved_at, &Rfc3339).is_err() {
        return Err(ChatHistoryError::InvalidTimestamp {
            path: path.to_path_buf(),
            field: "saved_at",
            value: record.saved_at.clone(),
        });
    }

    if record.chat.id != chat_id {
        return Err(ChatHistoryError::ChatIdMismatch {
            path: path.to_path_buf(),
            expected: chat_id.to_string(),
            found: record.chat.id.clone(),
        });
    }

    Ok(())
}

fn now_rfc3339() -> Result<String, ChatHistoryError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(ChatHistoryError::ClockFormat)
}
