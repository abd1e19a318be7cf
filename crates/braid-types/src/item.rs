use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mode::ChatMode;

/// Lifecycle of a thread item. Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Queued,
    Pending,
    Completed,
    Error,
    Aborted,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::Completed | ItemStatus::Error | ItemStatus::Aborted
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Completed,
    Error,
}

/// Progress of one named workflow step, merged append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl StepState {
    pub fn pending() -> Self {
        Self {
            status: StepStatus::Pending,
            text: None,
            data: Value::Null,
        }
    }

    pub fn completed(text: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Completed,
            text: Some(text.into()),
            data: Value::Null,
        }
    }
}

/// Accumulating answer text. `text` grows as deltas stream in;
/// `final_text` is the authoritative snapshot once resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_text: Option<String>,
}

impl Answer {
    /// Text to render: the resolved snapshot wins over the accumulator.
    pub fn display_text(&self) -> &str {
        self.final_text.as_deref().unwrap_or(&self.text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_call_id: String,
    pub result: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub duration_ms: u64,
}

/// One query + response unit within a thread.
///
/// Items sharing a `branch_root_id` are alternative answers to the same
/// parent (one branch group); the Conversation Store tracks which
/// sibling is displayed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThreadItem {
    pub id: String,
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_root_id: Option<String>,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_attachment: Option<String>,
    pub mode: ChatMode,
    pub status: ItemStatus,
    #[serde(default)]
    pub answer: Answer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_process: Option<String>,
    #[serde(default)]
    pub steps: BTreeMap<String, StepState>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_duration_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ThreadItem {
    pub fn new(thread_id: impl Into<String>, query: impl Into<String>, mode: ChatMode) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            parent_id: None,
            branch_root_id: None,
            query: query.into(),
            image_attachment: None,
            mode,
            status: ItemStatus::Queued,
            answer: Answer::default(),
            thinking_process: None,
            steps: BTreeMap::new(),
            sources: Vec::new(),
            suggestions: Vec::new(),
            error: None,
            metadata: HashMap::new(),
            tokens_used: None,
            generation_duration_ms: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_branch_root(mut self, root_id: impl Into<String>) -> Self {
        self.branch_root_id = Some(root_id.into());
        self
    }

    /// Branch-group key after normalization: the explicit root if set,
    /// otherwise the parent for reply items, otherwise the item itself.
    pub fn effective_branch_root(&self) -> &str {
        self.branch_root_id
            .as_deref()
            .or(self.parent_id.as_deref())
            .unwrap_or(&self.id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
