pub mod builder;
pub mod clients;
pub mod context;
pub mod flow;
pub mod sink;
pub mod task;
pub mod tasks;

use std::sync::Arc;

use anyhow::Result;
use braid_gen::{CredentialStore, SearchClient};

pub use builder::FlowBuilder;
pub use clients::{model_id, ClientFactory};
pub use context::FlowContext;
pub use flow::{Flow, FlowHandle, FlowTimings, TaskTiming};
pub use sink::{EventSink, OnAllHook};
pub use task::{NextTask, Task, TaskResult};

// Re-export the event vocabulary tasks emit.
pub use braid_types::{ChatEvent, CompletionRequest, DoneStatus, EventEnvelope};

/// The standard chat workflow: router → (search) → generate →
/// (suggestions).
pub fn standard_flow(
    credentials: Arc<dyn CredentialStore>,
    clients: Arc<dyn ClientFactory>,
    search: Arc<dyn SearchClient>,
) -> Result<Flow> {
    Flow::builder()
        .task(Arc::new(tasks::RouterTask::new(credentials)))
        .task(Arc::new(tasks::SearchTask::new(Arc::clone(&search))))
        .task(Arc::new(tasks::GenerateTask::new(Arc::clone(&clients))))
        .task(Arc::new(tasks::SuggestionsTask::new(clients)))
        .entry(tasks::ROUTER_TASK)
        .build()
}
