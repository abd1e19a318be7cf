use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::mode::ChatMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// One turn of prior conversation context sent with a completion
/// request, already linearized by the Conversation Store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Inbound request at the orchestration entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub mode: ChatMode,
    pub prompt: String,
    pub thread_id: String,
    pub thread_item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_thread_item_id: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    #[serde(default)]
    pub web_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub mcp_config: HashMap<String, String>,
    #[serde(default)]
    pub show_suggestions: bool,
    /// Mode the user originally asked for, before Auto resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_mode: Option<ChatMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode_selection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_attachment: Option<String>,
}

impl CompletionRequest {
    pub fn new(
        mode: ChatMode,
        prompt: impl Into<String>,
        thread_id: impl Into<String>,
        thread_item_id: impl Into<String>,
    ) -> Self {
        Self {
            mode,
            prompt: prompt.into(),
            thread_id: thread_id.into(),
            thread_item_id: thread_item_id.into(),
            parent_thread_item_id: None,
            messages: Vec::new(),
            custom_instructions: None,
            web_search: false,
            max_iterations: None,
            mcp_config: HashMap::new(),
            show_suggestions: false,
            requested_mode: None,
            mode_selection_reason: None,
            image_attachment: None,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_attachment.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_with_defaults() {
        let json = r#"{
            "mode": "auto",
            "prompt": "hello",
            "threadId": "t1",
            "threadItemId": "i1"
        }"#;
        let req: CompletionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.mode, ChatMode::Auto);
        assert!(!req.web_search);
        assert!(req.messages.is_empty());
        assert!(req.parent_thread_item_id.is_none());
    }
}
