use std::fmt;

use serde::{Deserialize, Serialize};

/// Agent identifier used for groups authored by the human user.
pub const USER_AGENT_ID: &str = "user";

/// Generates a fresh identifier for groups, messages, and outputs.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Languages the assistant may emit executable code in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    Python,
    Shell,
    AppleScript,
}

impl CodeLanguage {
    pub const ALL: [Self; 3] = [Self::Python, Self::Shell, Self::AppleScript];

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "python" => Self::Python,
            "shell" => Self::Shell,
            "applescript" => Self::AppleScript,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Shell => "shell",
            Self::AppleScript => "applescript",
        }
    }
}

impl fmt::Display for CodeLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One captured output of an executed code message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeOutput {
    pub id: String,
    pub content: String,
}

impl CodeOutput {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: new_id(),
            content: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainMessage {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeMessage {
    pub id: String,
    pub content: String,
    pub language: CodeLanguage,
    #[serde(default)]
    pub outputs: Vec<CodeOutput>,
}

/// A transcript message. The variant is fixed at creation.
///
/// On the wire a code message is recognized by its `language` field, so the
/// code variant is tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Code(CodeMessage),
    Plain(PlainMessage),
}

impl Message {
    #[must_use]
    pub fn plain(content: impl Into<String>) -> Self {
        Self::Plain(PlainMessage {
            id: new_id(),
            content: content.into(),
        })
    }

    #[must_use]
    pub fn code(language: CodeLanguage, content: impl Into<String>) -> Self {
        Self::Code(CodeMessage {
            id: new_id(),
            content: content.into(),
            language,
            outputs: Vec::new(),
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Code(message) => &message.id,
            Self::Plain(message) => &message.id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Code(message) => &message.content,
            Self::Plain(message) => &message.content,
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Self::Code(_))
    }

    pub fn as_code(&self) -> Option<&CodeMessage> {
        match self {
            Self::Code(message) => Some(message),
            Self::Plain(_) => None,
        }
    }

    pub(crate) fn as_code_mut(&mut self) -> Option<&mut CodeMessage> {
        match self {
            Self::Code(message) => Some(message),
            Self::Plain(_) => None,
        }
    }

    pub(crate) fn push_str(&mut self, text: &str) {
        match self {
            Self::Code(message) => message.content.push_str(text),
            Self::Plain(message) => message.content.push_str(text),
        }
    }
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageGroup {
    pub id: String,
    pub agent_id: String,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub materials_ids: Vec<String>,
    pub role: Role,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl MessageGroup {
    /// Creates an empty assistant turn that continues work for `agent_id`.
    #[must_use]
    pub fn assistant(
        agent_id: impl Into<String>,
        task: Option<String>,
        materials_ids: Vec<String>,
    ) -> Self {
        Self {
            id: new_id(),
            agent_id: agent_id.into(),
            task,
            materials_ids,
            role: Role::Assistant,
            messages: Vec::new(),
        }
    }

    /// Creates a user turn holding one plain message.
    #[must_use]
    pub fn user(text: impl Into<String>, materials_ids: Vec<String>) -> Self {
        Self {
            id: new_id(),
            agent_id: USER_AGENT_ID.to_string(),
            task: None,
            materials_ids,
            role: Role::User,
            messages: vec![Message::plain(text)],
        }
    }

    pub fn is_from_user(&self) -> bool {
        self.agent_id == USER_AGENT_ID
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub message_groups: Vec<MessageGroup>,
}

impl Conversation {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_groups: Vec::new(),
        }
    }
}
