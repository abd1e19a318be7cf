use async_trait::async_trait;

use crate::context::FlowContext;
use crate::sink::EventSink;

/// Outcome of one task execution. `retry` asks the runner to re-run
/// the task, bounded by the flow's retry cap.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Success,
    Error { message: String, retry: bool },
}

impl TaskResult {
    pub fn error(message: impl Into<String>) -> Self {
        TaskResult::Error {
            message: message.into(),
            retry: false,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        TaskResult::Error {
            message: message.into(),
            retry: true,
        }
    }
}

/// Name of the task to execute next, decided by the previous task's
/// routing function after it ran.
#[derive(Debug, Clone, PartialEq)]
pub enum NextTask {
    Task(&'static str),
    End,
}

/// A unit of work in the flow: generate text, run a search, produce
/// suggestions. Tasks emit progress through the sink and route
/// dynamically based on the context they just mutated.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &mut FlowContext, events: &EventSink) -> TaskResult;

    /// Pick the next task given the final context. Routing runs only
    /// after a successful execution.
    fn route(&self, ctx: &FlowContext) -> NextTask;
}
