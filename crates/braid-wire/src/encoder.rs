//! Serializes workflow events into the textual server-push stream: one
//! event-name line, one JSON data line, blank-line terminator.

use braid_types::{ChatEvent, EventEnvelope};
use tokio::sync::mpsc;

/// Convert literal backslash-n sequences into real newlines. Model
/// output sometimes arrives with escaped newlines baked into the text.
pub fn normalize_text(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn normalize_envelope(envelope: &EventEnvelope) -> EventEnvelope {
    let mut envelope = envelope.clone();
    if let ChatEvent::Answer(delta) = &mut envelope.event {
        delta.text = delta.text.as_deref().map(normalize_text);
        delta.full_text = delta.full_text.as_deref().map(normalize_text);
        delta.final_text = delta.final_text.as_deref().map(normalize_text);
        delta.thinking = delta.thinking.as_deref().map(normalize_text);
    }
    envelope
}

/// Encode one envelope as a wire frame:
/// `event: <name>\ndata: <json>\n\n`.
pub fn encode_frame(envelope: &EventEnvelope) -> Result<String, serde_json::Error> {
    let envelope = normalize_envelope(envelope);
    let body = envelope.to_json()?;
    Ok(format!(
        "event: {}\ndata: {}\n\n",
        envelope.event_name(),
        body
    ))
}

/// Minimal terminal frame used when payload serialization fails. Built
/// by hand so it cannot itself fail, and still carries the identifiers
/// the consumer needs to close out UI state.
pub fn fallback_done_frame(envelope: &EventEnvelope, error: &str) -> String {
    let mut body = serde_json::json!({
        "type": "done",
        "status": "error",
        "error": error,
        "threadId": envelope.thread_id,
        "threadItemId": envelope.thread_item_id,
    });
    if let Some(parent) = &envelope.parent_thread_item_id {
        body["parentThreadItemId"] = serde_json::json!(parent);
    }
    format!("event: done\ndata: {}\n\n", body)
}

/// Outbound frame writer. Once the underlying sink reports closed (the
/// client went away), every later write is silently dropped instead of
/// raising.
pub struct FrameSender {
    tx: mpsc::Sender<String>,
    closed: bool,
}

impl FrameSender {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx, closed: false }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Write one frame. Serialization failure degrades to a minimal
    /// terminal error frame; a failed channel send marks the sink
    /// closed and turns this into a no-op.
    pub async fn send_message(&mut self, envelope: &EventEnvelope) {
        if self.closed {
            return;
        }

        let frame = match encode_frame(envelope) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(
                    event = envelope.event_name(),
                    "failed to serialize event payload: {}",
                    e
                );
                fallback_done_frame(envelope, "Failed to serialize response payload")
            }
        };

        if self.tx.send(frame).await.is_err() {
            tracing::debug!("stream sink closed, dropping subsequent frames");
            self.closed = true;
        }
    }
}
