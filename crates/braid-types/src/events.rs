use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::item::{ItemStatus, Source, StepState, ToolCall, ToolResult};

/// Terminal outcome carried by the `done` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoneStatus {
    Complete,
    Error,
    Aborted,
}

impl DoneStatus {
    pub fn item_status(&self) -> ItemStatus {
        match self {
            DoneStatus::Complete => ItemStatus::Completed,
            DoneStatus::Error => ItemStatus::Error,
            DoneStatus::Aborted => ItemStatus::Aborted,
        }
    }
}

/// Incremental answer payload.
///
/// `text` is a streaming delta appended to the accumulator. `full_text`
/// and `final_text` are authoritative snapshots that replace it;
/// `final_text` takes precedence over `full_text` everywhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_text: Option<String>,
    /// Auxiliary reasoning text, appended to the item's thinking process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl AnswerDelta {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            final_text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        Self {
            thinking: Some(text.into()),
            ..Self::default()
        }
    }
}

/// Typed progress event emitted by workflow tasks.
///
/// The fixed event-name enumeration replaces the dynamically keyed
/// payloads of loosely typed clients: each variant owns its payload
/// shape so handling stays exhaustive at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Answer(AnswerDelta),
    Steps(BTreeMap<String, StepState>),
    Sources(Vec<Source>),
    Suggestions(Vec<String>),
    Status(ItemStatus),
    Object(Value),
    ToolCalls(Vec<ToolCall>),
    ToolResults(Vec<ToolResult>),
    Error { message: String },
    Metrics {
        tokens_used: Option<u64>,
        duration_ms: Option<u64>,
    },
    Done {
        status: DoneStatus,
        error: Option<String>,
    },
}

impl ChatEvent {
    /// Wire event name; doubles as the payload key inside the frame.
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::Answer(_) => "answer",
            ChatEvent::Steps(_) => "steps",
            ChatEvent::Sources(_) => "sources",
            ChatEvent::Suggestions(_) => "suggestions",
            ChatEvent::Status(_) => "status",
            ChatEvent::Object(_) => "object",
            ChatEvent::ToolCalls(_) => "toolCalls",
            ChatEvent::ToolResults(_) => "toolResults",
            ChatEvent::Error { .. } => "error",
            ChatEvent::Metrics { .. } => "metrics",
            ChatEvent::Done { .. } => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Done { .. })
    }

    /// Event-specific payload (everything except the identifiers).
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            ChatEvent::Answer(delta) => serde_json::to_value(delta),
            ChatEvent::Steps(steps) => serde_json::to_value(steps),
            ChatEvent::Sources(sources) => serde_json::to_value(sources),
            ChatEvent::Suggestions(suggestions) => serde_json::to_value(suggestions),
            ChatEvent::Status(status) => serde_json::to_value(status),
            ChatEvent::Object(value) => Ok(value.clone()),
            ChatEvent::ToolCalls(calls) => serde_json::to_value(calls),
            ChatEvent::ToolResults(results) => serde_json::to_value(results),
            ChatEvent::Error { message } => Ok(json!({ "message": message })),
            ChatEvent::Metrics {
                tokens_used,
                duration_ms,
            } => Ok(json!({ "tokensUsed": tokens_used, "durationMs": duration_ms })),
            ChatEvent::Done { status, error } => {
                let mut payload = json!({ "type": "done", "status": status });
                if let Some(error) = error {
                    payload["error"] = json!(error);
                }
                Ok(payload)
            }
        }
    }

    /// Rebuild an event from its wire name and payload.
    pub fn from_wire(name: &str, payload: &Value) -> Option<Self> {
        let event = match name {
            "answer" => ChatEvent::Answer(serde_json::from_value(payload.clone()).ok()?),
            "steps" => ChatEvent::Steps(serde_json::from_value(payload.clone()).ok()?),
            "sources" => ChatEvent::Sources(serde_json::from_value(payload.clone()).ok()?),
            "suggestions" => {
                ChatEvent::Suggestions(serde_json::from_value(payload.clone()).ok()?)
            }
            "status" => ChatEvent::Status(serde_json::from_value(payload.clone()).ok()?),
            "object" => ChatEvent::Object(payload.clone()),
            "toolCalls" => ChatEvent::ToolCalls(serde_json::from_value(payload.clone()).ok()?),
            "toolResults" => {
                ChatEvent::ToolResults(serde_json::from_value(payload.clone()).ok()?)
            }
            "error" => ChatEvent::Error {
                message: payload
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            "metrics" => ChatEvent::Metrics {
                tokens_used: payload.get("tokensUsed").and_then(Value::as_u64),
                duration_ms: payload.get("durationMs").and_then(Value::as_u64),
            },
            "done" => ChatEvent::Done {
                status: payload
                    .get("status")
                    .and_then(|s| serde_json::from_value(s.clone()).ok())?,
                error: payload
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            _ => return None,
        };
        Some(event)
    }
}

/// A [`ChatEvent`] attributed to the run that produced it. Every frame
/// on the wire carries these identifiers so the consumer can close out
/// optimistic UI state even on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub thread_id: String,
    pub thread_item_id: String,
    pub parent_thread_item_id: Option<String>,
    pub event: ChatEvent,
}

impl EventEnvelope {
    pub fn new(
        thread_id: impl Into<String>,
        thread_item_id: impl Into<String>,
        parent_thread_item_id: Option<String>,
        event: ChatEvent,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            thread_item_id: thread_item_id.into(),
            parent_thread_item_id,
            event,
        }
    }

    pub fn event_name(&self) -> &'static str {
        self.event.name()
    }

    /// Full wire body: identifiers plus the payload keyed by event name.
    /// The `done` payload is flattened into the body so the terminal
    /// frame matches `{type:"done", status, threadId, ...}`.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        let payload = self.event.payload()?;
        let mut body = match &self.event {
            ChatEvent::Done { .. } => payload,
            _ => json!({ self.event.name(): payload }),
        };
        body["threadId"] = json!(self.thread_id);
        body["threadItemId"] = json!(self.thread_item_id);
        if let Some(parent) = &self.parent_thread_item_id {
            body["parentThreadItemId"] = json!(parent);
        }
        Ok(body)
    }

    /// Rebuild an envelope from a decoded frame. Returns `None` when
    /// identifiers are missing or the payload does not match the name.
    pub fn from_wire(name: &str, body: &Value) -> Option<Self> {
        let thread_id = body.get("threadId")?.as_str()?.to_string();
        let thread_item_id = body.get("threadItemId")?.as_str()?.to_string();
        let parent_thread_item_id = body
            .get("parentThreadItemId")
            .and_then(Value::as_str)
            .map(str::to_string);
        let payload = if name == "done" {
            body
        } else {
            body.get(name)?
        };
        let event = ChatEvent::from_wire(name, payload)?;
        Some(Self {
            thread_id,
            thread_item_id,
            parent_thread_item_id,
            event,
        })
    }
}
