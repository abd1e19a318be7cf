use std::collections::HashMap;

use braid_gen::PageContent;
use braid_types::{ChatMode, CompletionRequest, Source};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Shared mutable state for one workflow run. Every task sees the same
/// context; the runner hands it to tasks one at a time, so no locking
/// is needed.
pub struct FlowContext {
    pub request: CompletionRequest,
    /// Mode actually running the request, after Auto resolution and
    /// availability substitution.
    pub mode: ChatMode,
    pub sources: Vec<Source>,
    pub pages: Vec<PageContent>,
    /// Accumulated answer text as generation streams in.
    pub answer: String,
    pub tokens_used: Option<u64>,
    pub variables: HashMap<String, Value>,
    cancel: CancellationToken,
}

impl FlowContext {
    pub fn new(request: CompletionRequest, cancel: CancellationToken) -> Self {
        let mode = request.mode;
        Self {
            request,
            mode,
            sources: Vec::new(),
            pages: Vec::new(),
            answer: String::new(),
            tokens_used: None,
            variables: HashMap::new(),
            cancel,
        }
    }

    /// Cooperative abort signal. Tasks check this at their own
    /// suspension points and exit promptly when set.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: Value) {
        self.variables.insert(key.into(), value);
    }

    pub fn var(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }
}
