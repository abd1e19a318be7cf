use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use braid_types::{ChatEvent, CompletionRequest, DoneStatus, EventEnvelope, ItemStatus};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::context::FlowContext;
use crate::sink::{EventSink, OnAllHook};
use crate::task::{NextTask, Task, TaskResult};

/// Wall-clock duration of one task execution, retries included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTiming {
    pub task: String,
    pub duration_ms: u64,
}

/// Timing summary for a completed run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowTimings {
    pub tasks: Vec<TaskTiming>,
    pub total_ms: u64,
}

/// Handle to a spawned run: cooperative abort plus the timing summary
/// once the run finishes.
pub struct FlowHandle {
    cancel: CancellationToken,
    join: JoinHandle<FlowTimings>,
}

impl FlowHandle {
    /// Request a cooperative abort. The run stops at its next
    /// checkpoint and emits a terminal `done` frame with `aborted`.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the run to finish and return its timing summary.
    pub async fn timings(self) -> FlowTimings {
        self.join.await.unwrap_or_default()
    }
}

/// Named task registry walked sequentially from the entry task. The
/// graph is resolved dynamically: each task's routing function picks
/// the next task from the context it just produced.
#[derive(Clone)]
pub struct Flow {
    tasks: Arc<HashMap<&'static str, Arc<dyn Task>>>,
    entry: &'static str,
    max_iterations: usize,
    retry_limit: usize,
    on_all: Option<OnAllHook>,
}

impl Flow {
    pub(crate) fn new(
        tasks: HashMap<&'static str, Arc<dyn Task>>,
        entry: &'static str,
        max_iterations: usize,
        retry_limit: usize,
        on_all: Option<OnAllHook>,
    ) -> Self {
        Self {
            tasks: Arc::new(tasks),
            entry,
            max_iterations,
            retry_limit,
            on_all,
        }
    }

    pub fn builder() -> crate::builder::FlowBuilder {
        crate::builder::FlowBuilder::new()
    }

    /// Spawn execution in the background; returns the event receiver
    /// and a handle for abort + diagnostics.
    pub fn spawn_run(&self, request: CompletionRequest) -> (mpsc::Receiver<EventEnvelope>, FlowHandle) {
        let (tx, rx) = mpsc::channel(1000);
        let cancel = CancellationToken::new();

        let flow = self.clone();
        let run_cancel = cancel.clone();
        let join = tokio::spawn(async move { flow.execute_loop(request, tx, run_cancel).await });

        (rx, FlowHandle { cancel, join })
    }

    async fn execute_loop(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<EventEnvelope>,
        cancel: CancellationToken,
    ) -> FlowTimings {
        let start = Instant::now();
        let mut sink = EventSink::new(
            request.thread_id.clone(),
            request.thread_item_id.clone(),
            request.parent_thread_item_id.clone(),
            tx,
        );
        if let Some(hook) = &self.on_all {
            sink = sink.with_on_all(Arc::clone(hook));
        }

        let max_iterations = request.max_iterations.unwrap_or(self.max_iterations);
        let mut ctx = FlowContext::new(request, cancel);
        let mut timings = FlowTimings::default();

        sink.send(ChatEvent::Status(ItemStatus::Pending)).await;

        let mut current = self.entry;
        let mut iteration = 0usize;
        let outcome = loop {
            if ctx.is_cancelled() {
                break RunOutcome::Aborted;
            }
            if iteration >= max_iterations {
                break RunOutcome::Failed(format!("max iterations ({max_iterations}) reached"));
            }

            let Some(task) = self.tasks.get(current) else {
                break RunOutcome::Failed(format!("unknown task: {current}"));
            };

            let task_start = Instant::now();
            let result = self.run_with_retries(task.as_ref(), &mut ctx, &sink).await;
            timings.tasks.push(TaskTiming {
                task: current.to_string(),
                duration_ms: task_start.elapsed().as_millis() as u64,
            });

            // Cancellation wins over whatever the task reported.
            if ctx.is_cancelled() {
                break RunOutcome::Aborted;
            }

            match result {
                TaskResult::Success => {}
                TaskResult::Error { message, .. } => break RunOutcome::Failed(message),
            }

            match task.route(&ctx) {
                NextTask::End => break RunOutcome::Completed,
                NextTask::Task(name) => current = name,
            }
            iteration += 1;
        };

        match &outcome {
            RunOutcome::Completed => {
                sink.send(ChatEvent::Done {
                    status: DoneStatus::Complete,
                    error: None,
                })
                .await;
            }
            RunOutcome::Aborted => {
                sink.send(ChatEvent::Status(ItemStatus::Aborted)).await;
                sink.send(ChatEvent::Done {
                    status: DoneStatus::Aborted,
                    error: None,
                })
                .await;
            }
            RunOutcome::Failed(message) => {
                tracing::warn!(task = current, "flow run failed: {}", message);
                sink.send(ChatEvent::Error {
                    message: message.clone(),
                })
                .await;
                sink.send(ChatEvent::Done {
                    status: DoneStatus::Error,
                    error: Some(message.clone()),
                })
                .await;
            }
        }

        timings.total_ms = start.elapsed().as_millis() as u64;
        timings
    }

    async fn run_with_retries(
        &self,
        task: &dyn Task,
        ctx: &mut FlowContext,
        sink: &EventSink,
    ) -> TaskResult {
        let mut attempts = 0usize;
        loop {
            let result = task.run(ctx, sink).await;
            match &result {
                TaskResult::Error { message, retry } if *retry && !ctx.is_cancelled() => {
                    attempts += 1;
                    if attempts > self.retry_limit {
                        return result;
                    }
                    tracing::debug!(
                        task = task.name(),
                        attempt = attempts,
                        "retrying task after transient error: {}",
                        message
                    );
                }
                _ => return result,
            }
        }
    }
}

enum RunOutcome {
    Completed,
    Aborted,
    Failed(String),
}
