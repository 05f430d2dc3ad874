use chat_transcript::{CodeLanguage, Conversation};
use serde::{Deserialize, Serialize};

/// Body of the "execute code" call. `chat_id` travels in the URL path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCodeRequest {
    #[serde(skip)]
    pub chat_id: String,
    pub language: CodeLanguage,
    pub code: String,
    #[serde(default)]
    pub materials_ids: Vec<String>,
}

/// Body of the "generate turn" call: the whole conversation plus the
/// materials and agent of the group being filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    #[serde(flatten)]
    pub chat: Conversation,
    #[serde(default)]
    pub relevant_materials_ids: Vec<String>,
    pub agent_id: String,
}

#[cfg(test)]
mod tests {
    use chat_transcript::{CodeLanguage, Conversation, MessageGroup};
    use serde_json::json;

    use super::{ExecuteRequest, RunCodeRequest};

    #[test]
    fn run_code_body_omits_chat_id() {
        let request = RunCodeRequest {
            chat_id: "chat-1".to_owned(),
            language: CodeLanguage::Shell,
            code: "ls".to_owned(),
            materials_ids: vec!["m1".to_owned()],
        };

        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({"language": "shell", "code": "ls", "materials_ids": ["m1"]})
        );
    }

    #[test]
    fn execute_body_flattens_conversation_fields() {
        let mut chat = Conversation::new("chat-1");
        chat.message_groups
            .push(MessageGroup::user("hi", Vec::new()));
        let request = ExecuteRequest {
            chat,
            relevant_materials_ids: vec!["m1".to_owned()],
            agent_id: "assistant".to_owned(),
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["id"], "chat-1");
        assert_eq!(value["agent_id"], "assistant");
        assert_eq!(value["relevant_materials_ids"], json!(["m1"]));
        assert_eq!(value["message_groups"][0]["agent_id"], "user");
    }
}
