//! Reconstructs thread-item state from the event stream. All writes to
//! an item funnel through [`StreamReducer::apply`]; each event kind has
//! an explicit merge function so the merge contract is testable in
//! isolation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use braid_types::{
    Answer, AnswerDelta, ChatEvent, ChatMode, EventEnvelope, ItemStatus, StepState, ThreadItem,
};
use serde_json::Value;

use crate::throttle::PersistThrottle;

/// Result of applying one event: the merged item snapshot, whether it
/// should reach durable storage now, and whether the run is over.
#[derive(Debug, Clone)]
pub struct ItemUpdate {
    pub item: ThreadItem,
    pub persist: bool,
    pub terminal: bool,
}

pub struct StreamReducer {
    items: HashMap<String, ThreadItem>,
    finished: HashSet<String>,
    throttle: PersistThrottle,
}

impl Default for StreamReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamReducer {
    pub fn new() -> Self {
        Self::with_flush_interval(Duration::from_secs(1))
    }

    pub fn with_flush_interval(interval: Duration) -> Self {
        Self {
            items: HashMap::new(),
            finished: HashSet::new(),
            throttle: PersistThrottle::new(interval),
        }
    }

    /// Seed the accumulator with the optimistically created item so
    /// stream updates merge into it instead of a placeholder.
    pub fn track(&mut self, item: ThreadItem) {
        self.items.insert(item.id.clone(), item);
    }

    /// Apply one stream event. Returns `None` when the event is a
    /// duplicate terminal frame or arrives after the item finished
    /// (idempotence: no double transition, no duplicate persistence).
    pub fn apply(&mut self, envelope: &EventEnvelope) -> Option<ItemUpdate> {
        if self.finished.contains(&envelope.thread_item_id) {
            return None;
        }

        let item = self
            .items
            .entry(envelope.thread_item_id.clone())
            .or_insert_with(|| {
                let mut item = ThreadItem::new(envelope.thread_id.clone(), "", ChatMode::Auto);
                item.id = envelope.thread_item_id.clone();
                item.parent_id = envelope.parent_thread_item_id.clone();
                item
            });

        // A `status` event can move the item to a terminal state ahead
        // of the `done` frame (abort does exactly this). Later events
        // are dropped, except the `done` frame itself: it must still
        // persist and release the accumulator entry.
        if item.status.is_terminal() && !matches!(envelope.event, ChatEvent::Done { .. }) {
            return None;
        }

        let terminal = envelope.event.is_terminal();
        if item.status == ItemStatus::Queued && !terminal {
            item.status = ItemStatus::Pending;
        }

        match &envelope.event {
            ChatEvent::Answer(delta) => merge_answer(item, delta),
            ChatEvent::Steps(steps) => merge_steps(&mut item.steps, steps),
            ChatEvent::Sources(sources) => item.sources = sources.clone(),
            ChatEvent::Suggestions(suggestions) => item.suggestions = suggestions.clone(),
            ChatEvent::Status(status) => item.status = *status,
            ChatEvent::Object(object) => merge_object(item, object),
            ChatEvent::ToolCalls(calls) => {
                item.metadata.insert(
                    "toolCalls".to_string(),
                    serde_json::to_value(calls).unwrap_or(Value::Null),
                );
            }
            ChatEvent::ToolResults(results) => {
                item.metadata.insert(
                    "toolResults".to_string(),
                    serde_json::to_value(results).unwrap_or(Value::Null),
                );
            }
            ChatEvent::Error { message } => item.error = Some(message.clone()),
            ChatEvent::Metrics {
                tokens_used,
                duration_ms,
            } => {
                // Counters only; never touches other fields.
                if tokens_used.is_some() {
                    item.tokens_used = *tokens_used;
                }
                if duration_ms.is_some() {
                    item.generation_duration_ms = *duration_ms;
                }
            }
            ChatEvent::Done { status, error } => {
                item.status = status.item_status();
                if let Some(error) = error {
                    item.error = Some(error.clone());
                }
                if item.answer.final_text.is_none() && !item.answer.text.is_empty() {
                    item.answer.final_text = Some(item.answer.text.clone());
                }
            }
        }

        item.touch();
        let snapshot = item.clone();
        if terminal {
            // Release the accumulator entry; the stored snapshot is
            // now the source of truth. The id stays in `finished` so a
            // duplicate terminal frame cannot re-transition the item.
            self.items.remove(&envelope.thread_item_id);
            self.finished.insert(envelope.thread_item_id.clone());
        }
        let persist = self
            .throttle
            .should_persist(&envelope.thread_item_id, terminal);

        Some(ItemUpdate {
            item: snapshot,
            persist,
            terminal,
        })
    }

    /// Drop accumulator state for a run that will never finish its
    /// stream (hard abort).
    pub fn release(&mut self, item_id: &str) {
        self.items.remove(item_id);
        self.throttle.release(item_id);
    }

    pub fn tracked(&self, item_id: &str) -> Option<&ThreadItem> {
        self.items.get(item_id)
    }
}

/// Canonical answer precedence: `final_text` > `full_text` > append
/// `text` delta. A previously resolved `final_text` is kept unless a
/// new one arrives.
pub fn merge_answer(item: &mut ThreadItem, delta: &AnswerDelta) {
    merge_answer_fields(&mut item.answer, delta);
    if let Some(thinking) = &delta.thinking {
        item.thinking_process
            .get_or_insert_with(String::new)
            .push_str(thinking);
    }
}

fn merge_answer_fields(answer: &mut Answer, delta: &AnswerDelta) {
    if let Some(final_text) = &delta.final_text {
        answer.final_text = Some(final_text.clone());
        answer.text = final_text.clone();
    } else if let Some(full_text) = &delta.full_text {
        answer.text = full_text.clone();
    } else if let Some(text) = &delta.text {
        answer.text.push_str(text);
    }
}

/// Structured objects land in metadata keyed by their `type` field
/// (untyped payloads replace the `object` key). A mode-resolution
/// object also moves the item onto the resolved mode, so the stored
/// item reflects the workflow that actually served it rather than the
/// client-sent `auto`.
pub fn merge_object(item: &mut ThreadItem, object: &Value) {
    let key = object
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("object")
        .to_string();
    if key == "modeResolution" {
        if let Some(mode) = object
            .get("mode")
            .and_then(|value| serde_json::from_value::<ChatMode>(value.clone()).ok())
        {
            item.mode = mode;
        }
    }
    item.metadata.insert(key, object.clone());
}

/// Append/merge-only step map update: incoming entries override status
/// and text, object data merges key-wise, existing entries are never
/// removed.
pub fn merge_steps(current: &mut BTreeMap<String, StepState>, incoming: &BTreeMap<String, StepState>) {
    for (step_id, incoming_state) in incoming {
        match current.get_mut(step_id) {
            Some(state) => {
                state.status = incoming_state.status;
                if incoming_state.text.is_some() {
                    state.text = incoming_state.text.clone();
                }
                match (state.data.as_object_mut(), incoming_state.data.as_object()) {
                    (Some(current_data), Some(incoming_data)) => {
                        for (key, value) in incoming_data {
                            current_data.insert(key.clone(), value.clone());
                        }
                    }
                    _ => {
                        if !incoming_state.data.is_null() {
                            state.data = incoming_state.data.clone();
                        }
                    }
                }
            }
            None => {
                current.insert(step_id.clone(), incoming_state.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_types::StepStatus;

    #[test]
    fn final_text_replaces_accumulated_deltas() {
        let mut item = ThreadItem::new("t", "q", ChatMode::Auto);
        merge_answer(&mut item, &AnswerDelta::delta("partial "));
        merge_answer(&mut item, &AnswerDelta::final_text("the whole answer"));
        assert_eq!(item.answer.text, "the whole answer");
        assert_eq!(item.answer.final_text.as_deref(), Some("the whole answer"));
    }

    #[test]
    fn full_text_replaces_but_keeps_final_unset() {
        let mut item = ThreadItem::new("t", "q", ChatMode::Auto);
        merge_answer(&mut item, &AnswerDelta::delta("par"));
        let delta = AnswerDelta {
            full_text: Some("snapshot".into()),
            ..AnswerDelta::default()
        };
        merge_answer(&mut item, &delta);
        assert_eq!(item.answer.text, "snapshot");
        assert!(item.answer.final_text.is_none());
    }

    #[test]
    fn thinking_accumulates_separately() {
        let mut item = ThreadItem::new("t", "q", ChatMode::Auto);
        merge_answer(&mut item, &AnswerDelta::thinking("step one. "));
        merge_answer(&mut item, &AnswerDelta::thinking("step two."));
        assert_eq!(
            item.thinking_process.as_deref(),
            Some("step one. step two.")
        );
        assert!(item.answer.text.is_empty());
    }

    #[test]
    fn mode_resolution_object_lands_on_the_item() {
        let mut item = ThreadItem::new("t", "q", ChatMode::Auto);
        let resolution = serde_json::json!({
            "type": "modeResolution",
            "requestedMode": "auto",
            "selectionReason": "Query looks like a coding task",
            "mode": "claude-sonnet",
        });
        merge_object(&mut item, &resolution);

        assert_eq!(item.mode, ChatMode::ClaudeSonnet);
        assert_eq!(item.metadata["modeResolution"], resolution);

        // Untyped payloads keep the plain replace semantics.
        let plain = serde_json::json!({ "answer": 42 });
        merge_object(&mut item, &plain);
        assert_eq!(item.metadata["object"], plain);
        assert_eq!(item.mode, ChatMode::ClaudeSonnet);
    }

    #[test]
    fn steps_merge_is_append_only() {
        let mut current = BTreeMap::new();
        current.insert("search".to_string(), StepState::pending());

        let mut incoming = BTreeMap::new();
        incoming.insert("search".to_string(), StepState::completed("3 results"));
        incoming.insert("read".to_string(), StepState::pending());
        merge_steps(&mut current, &incoming);

        assert_eq!(current.len(), 2);
        assert_eq!(current["search"].status, StepStatus::Completed);
        assert_eq!(current["search"].text.as_deref(), Some("3 results"));
    }
}
