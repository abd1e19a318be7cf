use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use braid_flow::{
    standard_flow, ChatEvent, CompletionRequest, DoneStatus, EventEnvelope, Flow, FlowContext,
    EventSink, NextTask, Task, TaskResult,
};
use braid_gen::{
    GenDelta, GenerationClient, GenerationRequest, PageContent, SearchClient, SearchResult,
    StaticCredentialStore,
};
use braid_types::{AnswerDelta, ChatMode, ItemStatus, Provider};
use serde_json::{json, Value};
use tokio::sync::mpsc;

struct StubTask {
    name: &'static str,
    next: NextTask,
    results: Vec<TaskResult>,
    calls: Arc<AtomicUsize>,
}

impl StubTask {
    fn ok(name: &'static str, next: NextTask) -> Self {
        Self {
            name,
            next,
            results: vec![TaskResult::Success],
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Task for StubTask {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, _ctx: &mut FlowContext, events: &EventSink) -> TaskResult {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        events
            .send(ChatEvent::Answer(AnswerDelta::delta(self.name)))
            .await;
        self.results
            .get(call.min(self.results.len() - 1))
            .cloned()
            .unwrap_or(TaskResult::Success)
    }

    fn route(&self, _ctx: &FlowContext) -> NextTask {
        self.next.clone()
    }
}

fn request() -> CompletionRequest {
    CompletionRequest::new(ChatMode::Gpt4oMini, "hello", "t1", "i1")
}

async fn collect(mut rx: mpsc::Receiver<EventEnvelope>) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    while let Some(envelope) = rx.recv().await {
        events.push(envelope);
    }
    events
}

#[tokio::test]
async fn walk_ends_with_done_complete() {
    let flow = Flow::builder()
        .task(Arc::new(StubTask::ok("first", NextTask::Task("second"))))
        .task(Arc::new(StubTask::ok("second", NextTask::End)))
        .entry("first")
        .build()
        .unwrap();

    let (rx, handle) = flow.spawn_run(request());
    let events = collect(rx).await;

    let last = events.last().unwrap();
    assert_eq!(
        last.event,
        ChatEvent::Done {
            status: DoneStatus::Complete,
            error: None,
        }
    );
    assert_eq!(last.thread_id, "t1");
    assert_eq!(last.thread_item_id, "i1");

    let timings = handle.timings().await;
    let names: Vec<&str> = timings.tasks.iter().map(|t| t.task.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[tokio::test]
async fn task_error_emits_error_then_done() {
    let flow = Flow::builder()
        .task(Arc::new(StubTask {
            name: "broken",
            next: NextTask::End,
            results: vec![TaskResult::error("boom")],
            calls: Arc::new(AtomicUsize::new(0)),
        }))
        .build()
        .unwrap();

    let (rx, _handle) = flow.spawn_run(request());
    let events = collect(rx).await;

    let kinds: Vec<&str> = events.iter().map(|e| e.event_name()).collect();
    assert!(kinds.contains(&"error"));
    assert_eq!(
        events.last().unwrap().event,
        ChatEvent::Done {
            status: DoneStatus::Error,
            error: Some("boom".into()),
        }
    );
}

#[tokio::test]
async fn transient_errors_are_retried_up_to_the_cap() {
    let calls = Arc::new(AtomicUsize::new(0));
    let flow = Flow::builder()
        .task(Arc::new(StubTask {
            name: "flaky",
            next: NextTask::End,
            results: vec![
                TaskResult::transient("net"),
                TaskResult::transient("net"),
                TaskResult::Success,
            ],
            calls: Arc::clone(&calls),
        }))
        .retry_limit(2)
        .build()
        .unwrap();

    let (rx, _handle) = flow.spawn_run(request());
    let events = collect(rx).await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        events.last().unwrap().event,
        ChatEvent::Done {
            status: DoneStatus::Complete,
            error: None,
        }
    );
}

#[tokio::test]
async fn retry_cap_exhaustion_fails_the_run() {
    let flow = Flow::builder()
        .task(Arc::new(StubTask {
            name: "flaky",
            next: NextTask::End,
            results: vec![TaskResult::transient("net")],
            calls: Arc::new(AtomicUsize::new(0)),
        }))
        .retry_limit(1)
        .build()
        .unwrap();

    let (rx, _handle) = flow.spawn_run(request());
    let events = collect(rx).await;
    assert!(matches!(
        events.last().unwrap().event,
        ChatEvent::Done {
            status: DoneStatus::Error,
            ..
        }
    ));
}

#[tokio::test]
async fn abort_yields_aborted_not_error() {
    struct SlowTask;

    #[async_trait]
    impl Task for SlowTask {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn run(&self, ctx: &mut FlowContext, _events: &EventSink) -> TaskResult {
            let token = ctx.cancel_token().clone();
            token.cancelled().await;
            TaskResult::Success
        }

        fn route(&self, _ctx: &FlowContext) -> NextTask {
            NextTask::End
        }
    }

    let flow = Flow::builder().task(Arc::new(SlowTask)).build().unwrap();
    let (rx, handle) = flow.spawn_run(request());
    handle.abort();
    let events = collect(rx).await;

    assert!(events
        .iter()
        .any(|e| e.event == ChatEvent::Status(ItemStatus::Aborted)));
    assert_eq!(
        events.last().unwrap().event,
        ChatEvent::Done {
            status: DoneStatus::Aborted,
            error: None,
        }
    );
}

#[tokio::test]
async fn max_iterations_guard_trips() {
    let flow = Flow::builder()
        .task(Arc::new(StubTask::ok("loop", NextTask::Task("loop"))))
        .max_iterations(3)
        .build()
        .unwrap();

    let (rx, _handle) = flow.spawn_run(request());
    let events = collect(rx).await;
    match &events.last().unwrap().event {
        ChatEvent::Done {
            status: DoneStatus::Error,
            error: Some(message),
        } => assert!(message.contains("max iterations")),
        other => panic!("expected error done frame, got {other:?}"),
    }
}

// ---- standard flow with mocked collaborators ----

struct ScriptedClient {
    deltas: Vec<GenDelta>,
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate_stream(
        &self,
        _request: GenerationRequest,
    ) -> braid_gen::error::Result<braid_gen::traits::GenStream> {
        let items: Vec<braid_gen::error::Result<GenDelta>> =
            self.deltas.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn generate_object(&self, _request: GenerationRequest) -> braid_gen::error::Result<Value> {
        Ok(json!({ "suggestions": ["what next?"] }))
    }
}

struct ScriptedFactory(Arc<ScriptedClient>);

impl braid_flow::ClientFactory for ScriptedFactory {
    fn client_for(
        &self,
        _mode: ChatMode,
    ) -> Result<Arc<dyn GenerationClient>, braid_gen::GenError> {
        Ok(self.0.clone())
    }
}

struct NoSearch;

#[async_trait]
impl SearchClient for NoSearch {
    async fn search(&self, _query: &str) -> braid_gen::error::Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }

    async fn read_pages(&self, _links: &[String]) -> braid_gen::error::Result<Vec<PageContent>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn standard_flow_streams_answer_and_suggestions() {
    let credentials =
        Arc::new(StaticCredentialStore::new().with_key(Provider::OpenAi, "test-key"));
    let client = Arc::new(ScriptedClient {
        deltas: vec![
            GenDelta::Text {
                content: "Hel".into(),
            },
            GenDelta::Text {
                content: "lo".into(),
            },
            GenDelta::Usage { total_tokens: 7 },
            GenDelta::Done {
                finish_reason: Some("stop".into()),
            },
        ],
    });
    let flow = standard_flow(
        credentials,
        Arc::new(ScriptedFactory(client)),
        Arc::new(NoSearch),
    )
    .unwrap();

    let mut request = request();
    request.show_suggestions = true;
    let (rx, handle) = flow.spawn_run(request);
    let events = collect(rx).await;

    let final_text = events.iter().find_map(|e| match &e.event {
        ChatEvent::Answer(delta) => delta.final_text.clone(),
        _ => None,
    });
    assert_eq!(final_text.as_deref(), Some("Hello"));

    assert!(events.iter().any(|e| matches!(
        &e.event,
        ChatEvent::Metrics {
            tokens_used: Some(7),
            ..
        }
    )));
    assert!(events
        .iter()
        .any(|e| matches!(&e.event, ChatEvent::Suggestions(s) if s == &vec!["what next?".to_string()])));
    assert_eq!(
        events.last().unwrap().event,
        ChatEvent::Done {
            status: DoneStatus::Complete,
            error: None,
        }
    );

    let timings = handle.timings().await;
    assert!(timings.tasks.iter().any(|t| t.task == "generate"));
}

#[tokio::test]
async fn auto_resolution_is_streamed_as_a_mode_resolution_object() {
    let credentials =
        Arc::new(StaticCredentialStore::new().with_key(Provider::Google, "test-key"));
    let client = Arc::new(ScriptedClient {
        deltas: vec![GenDelta::Done {
            finish_reason: Some("stop".into()),
        }],
    });
    let flow = standard_flow(
        credentials,
        Arc::new(ScriptedFactory(client)),
        Arc::new(NoSearch),
    )
    .unwrap();

    // Short query resolves to the fast tier.
    let request = CompletionRequest::new(ChatMode::Auto, "hello there", "t1", "i1");
    let (rx, _handle) = flow.spawn_run(request);
    let events = collect(rx).await;

    let resolution = events
        .iter()
        .find_map(|e| match &e.event {
            ChatEvent::Object(object) if object["type"] == "modeResolution" => Some(object),
            _ => None,
        })
        .expect("router streams its resolution");
    assert_eq!(resolution["requestedMode"], "auto");
    assert_eq!(resolution["mode"], "gemini-flash");
    assert!(resolution["selectionReason"].is_string());
}
