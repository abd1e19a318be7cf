use std::sync::Arc;

use async_trait::async_trait;
use braid_types::{ChatEvent, ChatMessage};
use braid_gen::GenerationRequest;
use serde_json::Value;

use crate::clients::{model_id, ClientFactory};
use crate::context::FlowContext;
use crate::sink::EventSink;
use crate::task::{NextTask, Task, TaskResult};

pub const SUGGESTIONS_TASK: &str = "suggestions";

const MAX_SUGGESTIONS: usize = 3;

/// Produces follow-up question suggestions from the finished answer.
/// Best-effort: a failure here never fails the run.
pub struct SuggestionsTask {
    clients: Arc<dyn ClientFactory>,
}

impl SuggestionsTask {
    pub fn new(clients: Arc<dyn ClientFactory>) -> Self {
        Self { clients }
    }

    fn parse_suggestions(value: &Value) -> Vec<String> {
        let array = value
            .get("suggestions")
            .and_then(Value::as_array)
            .or_else(|| value.as_array());
        array
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .take(MAX_SUGGESTIONS)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Task for SuggestionsTask {
    fn name(&self) -> &'static str {
        SUGGESTIONS_TASK
    }

    async fn run(&self, ctx: &mut FlowContext, events: &EventSink) -> TaskResult {
        if ctx.is_cancelled() {
            return TaskResult::Success;
        }

        let client = match self.clients.client_for(ctx.mode) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("skipping suggestions: {}", e);
                return TaskResult::Success;
            }
        };

        let prompt = format!(
            "Given this question and answer, propose up to {MAX_SUGGESTIONS} short follow-up \
             questions as JSON: {{\"suggestions\": [\"...\"]}}.\n\nQuestion: {}\n\nAnswer: {}",
            ctx.request.prompt, ctx.answer
        );
        let request = GenerationRequest::new(model_id(ctx.mode), vec![ChatMessage::user(prompt)]);

        match client.generate_object(request).await {
            Ok(value) => {
                let suggestions = Self::parse_suggestions(&value);
                if !suggestions.is_empty() {
                    events.send(ChatEvent::Suggestions(suggestions)).await;
                }
            }
            Err(e) => tracing::warn!("suggestions generation failed: {}", e),
        }

        TaskResult::Success
    }

    fn route(&self, _ctx: &FlowContext) -> NextTask {
        NextTask::End
    }
}
