use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use braid_gen::SearchClient;
use braid_types::{ChatEvent, Source, StepState};

use crate::context::FlowContext;
use crate::sink::EventSink;
use crate::task::{NextTask, Task, TaskResult};

pub const SEARCH_TASK: &str = "search";

/// How many result pages are fetched for grounding context.
const MAX_PAGES: usize = 3;

/// Web retrieval: search, surface the sources immediately, then read
/// the top pages into context for the generation task.
pub struct SearchTask {
    search: Arc<dyn SearchClient>,
}

impl SearchTask {
    pub fn new(search: Arc<dyn SearchClient>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Task for SearchTask {
    fn name(&self) -> &'static str {
        SEARCH_TASK
    }

    async fn run(&self, ctx: &mut FlowContext, events: &EventSink) -> TaskResult {
        let mut steps = BTreeMap::new();
        steps.insert("search".to_string(), StepState::pending());
        events.send(ChatEvent::Steps(steps)).await;

        if ctx.is_cancelled() {
            return TaskResult::Success;
        }

        let results = match self.search.search(&ctx.request.prompt).await {
            Ok(results) => results,
            Err(e) if e.is_transient() => return TaskResult::transient(e.user_message()),
            Err(e) => return TaskResult::error(e.user_message()),
        };

        ctx.sources = results
            .iter()
            .enumerate()
            .map(|(i, result)| Source {
                title: result.title.clone(),
                link: result.link.clone(),
                snippet: result.snippet.clone(),
                index: Some(i as u32 + 1),
            })
            .collect();
        events.send(ChatEvent::Sources(ctx.sources.clone())).await;

        if ctx.is_cancelled() {
            return TaskResult::Success;
        }

        let links: Vec<String> = results
            .iter()
            .take(MAX_PAGES)
            .map(|result| result.link.clone())
            .collect();
        match self.search.read_pages(&links).await {
            Ok(pages) => ctx.pages = pages,
            // Reading pages is best-effort; snippets alone still ground
            // the answer.
            Err(e) => tracing::warn!("page read failed, continuing with snippets: {}", e),
        }

        let mut steps = BTreeMap::new();
        steps.insert(
            "search".to_string(),
            StepState::completed(format!("Found {} sources", ctx.sources.len())),
        );
        events.send(ChatEvent::Steps(steps)).await;

        TaskResult::Success
    }

    fn route(&self, _ctx: &FlowContext) -> NextTask {
        NextTask::Task(super::generate::GENERATE_TASK)
    }
}
