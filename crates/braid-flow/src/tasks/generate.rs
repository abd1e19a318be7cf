use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use braid_gen::{GenDelta, GenerationRequest};
use braid_types::{AnswerDelta, ChatEvent, ChatMessage};
use futures::StreamExt;

use crate::clients::{model_id, ClientFactory};
use crate::context::FlowContext;
use crate::sink::EventSink;
use crate::task::{NextTask, Task, TaskResult};

pub const GENERATE_TASK: &str = "generate";

/// Streams model output as `answer` events, closing with an
/// authoritative final snapshot and a metrics event.
pub struct GenerateTask {
    clients: Arc<dyn ClientFactory>,
}

impl GenerateTask {
    pub fn new(clients: Arc<dyn ClientFactory>) -> Self {
        Self { clients }
    }

    fn build_request(ctx: &FlowContext) -> GenerationRequest {
        let mut messages = Vec::new();

        let mut system = String::new();
        if let Some(instructions) = &ctx.request.custom_instructions {
            system.push_str(instructions);
            system.push('\n');
        }
        if !ctx.pages.is_empty() || !ctx.sources.is_empty() {
            system.push_str("Ground your answer in the following sources:\n");
            for source in &ctx.sources {
                system.push_str(&format!("[{}] {} ({})\n",
                    source.index.unwrap_or_default(), source.title, source.link));
                if let Some(snippet) = &source.snippet {
                    system.push_str(snippet);
                    system.push('\n');
                }
            }
            for page in &ctx.pages {
                system.push_str(&format!("\nContent of {}:\n{}\n", page.link, page.content));
            }
        }
        if !system.is_empty() {
            messages.push(ChatMessage::system(system));
        }

        messages.extend(ctx.request.messages.iter().cloned());
        messages.push(ChatMessage::user(ctx.request.prompt.clone()));

        GenerationRequest::new(model_id(ctx.mode), messages)
    }
}

#[async_trait]
impl Task for GenerateTask {
    fn name(&self) -> &'static str {
        GENERATE_TASK
    }

    async fn run(&self, ctx: &mut FlowContext, events: &EventSink) -> TaskResult {
        let client = match self.clients.client_for(ctx.mode) {
            Ok(client) => client,
            Err(e) => return TaskResult::error(e.user_message()),
        };

        let request = Self::build_request(ctx);
        let start = Instant::now();

        let mut stream = match client.generate_stream(request).await {
            Ok(stream) => stream,
            Err(e) if e.is_transient() => return TaskResult::transient(e.user_message()),
            Err(e) => return TaskResult::error(e.user_message()),
        };

        let cancel = ctx.cancel_token().clone();
        loop {
            let delta = tokio::select! {
                biased;
                _ = cancel.cancelled() => return TaskResult::Success,
                delta = stream.next() => delta,
            };
            let delta = match delta {
                Some(Ok(delta)) => delta,
                Some(Err(e)) if e.is_transient() => {
                    return TaskResult::transient(e.user_message())
                }
                Some(Err(e)) => return TaskResult::error(e.user_message()),
                None => break,
            };

            match delta {
                GenDelta::Text { content } => {
                    ctx.answer.push_str(&content);
                    events
                        .send(ChatEvent::Answer(AnswerDelta::delta(content)))
                        .await;
                }
                GenDelta::Reasoning { content } => {
                    events
                        .send(ChatEvent::Answer(AnswerDelta::thinking(content)))
                        .await;
                }
                GenDelta::Usage { total_tokens } => {
                    ctx.tokens_used = Some(total_tokens);
                }
                GenDelta::Done { .. } => break,
            }
        }

        events
            .send(ChatEvent::Answer(AnswerDelta::final_text(
                ctx.answer.clone(),
            )))
            .await;
        events
            .send(ChatEvent::Metrics {
                tokens_used: ctx.tokens_used,
                duration_ms: Some(start.elapsed().as_millis() as u64),
            })
            .await;

        TaskResult::Success
    }

    fn route(&self, ctx: &FlowContext) -> NextTask {
        if ctx.request.show_suggestions && !ctx.answer.is_empty() {
            NextTask::Task(super::suggestions::SUGGESTIONS_TASK)
        } else {
            NextTask::End
        }
    }
}
