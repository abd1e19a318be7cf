use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::flow::Flow;
use crate::sink::OnAllHook;
use crate::task::Task;

const DEFAULT_MAX_ITERATIONS: usize = 25;
const DEFAULT_RETRY_LIMIT: usize = 2;

/// Fluent construction of a [`Flow`].
pub struct FlowBuilder {
    tasks: HashMap<&'static str, Arc<dyn Task>>,
    entry: Option<&'static str>,
    max_iterations: usize,
    retry_limit: usize,
    on_all: Option<OnAllHook>,
}

impl FlowBuilder {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            entry: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            retry_limit: DEFAULT_RETRY_LIMIT,
            on_all: None,
        }
    }

    /// Register a task under its own name. The first registered task
    /// becomes the entry unless [`entry`](Self::entry) overrides it.
    pub fn task(mut self, task: Arc<dyn Task>) -> Self {
        let name = task.name();
        if self.entry.is_none() {
            self.entry = Some(name);
        }
        self.tasks.insert(name, task);
        self
    }

    pub fn entry(mut self, name: &'static str) -> Self {
        self.entry = Some(name);
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn retry_limit(mut self, limit: usize) -> Self {
        self.retry_limit = limit;
        self
    }

    /// Subscribe to every event of every run spawned from this flow.
    pub fn on_all(mut self, hook: OnAllHook) -> Self {
        self.on_all = Some(hook);
        self
    }

    pub fn build(self) -> Result<Flow> {
        let entry = self.entry.ok_or_else(|| anyhow!("flow has no tasks"))?;
        if !self.tasks.contains_key(entry) {
            return Err(anyhow!("entry task {entry:?} is not registered"));
        }
        Ok(Flow::new(
            self.tasks,
            entry,
            self.max_iterations,
            self.retry_limit,
            self.on_all,
        ))
    }
}

impl Default for FlowBuilder {
    fn default() -> Self {
        Self::new()
    }
}
