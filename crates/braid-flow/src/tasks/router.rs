use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use braid_gen::CredentialStore;
use braid_modes::{ensure_provider_availability, resolve};
use braid_types::{ChatEvent, ChatMode, StepState};
use serde_json::{json, Value};

use crate::context::FlowContext;
use crate::sink::EventSink;
use crate::task::{NextTask, Task, TaskResult};

pub const ROUTER_TASK: &str = "router";

/// Entry task: resolves `Auto` to a concrete mode and verifies the
/// backing provider can actually serve the request, substituting a
/// fallback for Auto-tier modes when it cannot.
pub struct RouterTask {
    credentials: Arc<dyn CredentialStore>,
}

impl RouterTask {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl Task for RouterTask {
    fn name(&self) -> &'static str {
        ROUTER_TASK
    }

    async fn run(&self, ctx: &mut FlowContext, events: &EventSink) -> TaskResult {
        let query = ctx.request.prompt.clone();
        let has_image = ctx.request.has_image();

        let mut resolution = serde_json::Map::new();
        resolution.insert("type".to_string(), json!("modeResolution"));

        if ctx.request.mode == ChatMode::Auto {
            let selection = resolve(&query, has_image);
            ctx.set_var("requestedMode", json!(ChatMode::Auto));
            ctx.set_var("selectionReason", json!(selection.reason));
            resolution.insert("requestedMode".to_string(), json!(ChatMode::Auto));
            resolution.insert("selectionReason".to_string(), json!(selection.reason));
        }

        let decision = match ensure_provider_availability(
            ctx.request.mode,
            &query,
            has_image,
            self.credentials.as_ref(),
        ) {
            Ok(decision) => decision,
            // Configuration errors are terminal and user-visible.
            Err(e) => return TaskResult::error(e.to_string()),
        };

        if let Some(message) = &decision.message {
            ctx.set_var("modeNotice", json!(message));
            resolution.insert("notice".to_string(), json!(message));
        }
        ctx.mode = decision.mode;
        resolution.insert("mode".to_string(), json!(decision.mode));

        // Land the resolved mode and its reasoning on the item itself.
        events
            .send(ChatEvent::Object(Value::Object(resolution)))
            .await;

        let mut steps = BTreeMap::new();
        steps.insert(
            "route".to_string(),
            StepState::completed(format!("Using {}", decision.mode.display_name())),
        );
        events.send(ChatEvent::Steps(steps)).await;

        TaskResult::Success
    }

    fn route(&self, ctx: &FlowContext) -> NextTask {
        if ctx.request.web_search {
            NextTask::Task(super::search::SEARCH_TASK)
        } else {
            NextTask::Task(super::generate::GENERATE_TASK)
        }
    }
}
