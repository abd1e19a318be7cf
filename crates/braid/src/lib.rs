//! # Braid
//!
//! Conversation orchestration core for streaming AI chat: mode routing,
//! task-graph execution, wire framing, branching conversation storage,
//! and multi-client sync.
//!
//! ## Overview
//!
//! Braid is the engine behind a multi-provider chat application. It can:
//!
//! - **Route requests** to the right model, with an automatic tier for
//!   cost-sensitive queries and provider-availability fallbacks
//! - **Run completions** as a graph of named tasks (route, search,
//!   generate, suggest) with retries and cancellation
//! - **Stream progress** as typed events framed for `text/event-stream`
//! - **Store conversations** as branching trees with per-group
//!   selections and a materialized linear view
//! - **Sync changes** across tabs and to a remote backend with
//!   debounced pushes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use braid::prelude::*;
//! use std::sync::Arc;
//!
//! # struct ApiClients;
//! # impl braid::ClientFactory for ApiClients {
//! #     fn client_for(
//! #         &self,
//! #         mode: braid::ChatMode,
//! #     ) -> Result<Arc<dyn braid::GenerationClient>, braid::GenError> {
//! #         Ok(Arc::new(braid::OpenAiCompatClient::new("sk-test")?))
//! #     }
//! # }
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials: Arc<dyn CredentialStore> = Arc::new(EnvCredentialStore);
//!
//!     let clients: Arc<dyn ClientFactory> = Arc::new(ApiClients);
//!     let search: Arc<dyn SearchClient> = Arc::new(braid::DisabledSearch);
//!     let flow = standard_flow(credentials, clients, search)?;
//!
//!     let request = CompletionRequest::new(
//!         ChatMode::Auto,
//!         "What is ownership in Rust?",
//!         "thread-1",
//!         "item-1",
//!     );
//!
//!     let (mut events, _handle) = flow.spawn_run(request);
//!     while let Some(envelope) = events.recv().await {
//!         println!("{}", envelope.to_json()?);
//!         if envelope.event.is_terminal() {
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Braid is organized into focused crates:
//!
//! - **`braid-types`**: threads, items, modes, events, requests
//! - **`braid-modes`**: query classification and provider availability
//! - **`braid-gen`**: provider-agnostic generation and search clients
//! - **`braid-flow`**: the task-graph runner and the standard chat flow
//! - **`braid-wire`**: event framing, decoding, and the stream reducer
//! - **`braid-store`**: branching conversation store with durable backends
//! - **`braid-sync`**: cross-tab change notes and remote push sync

pub mod prelude;

pub use braid_types::{
    AnswerDelta, ChatEvent, ChatMessage, ChatMode, CompletionRequest, DoneStatus, EventEnvelope,
    ItemStatus, MessageRole, Provider, Source, StepState, StepStatus, Thread, ThreadItem,
    ToolCall, ToolResult,
};

pub use braid_modes::{
    ensure_provider_availability, resolve, select_mode, selection_reason, ModeDecision, ModeError,
    ModeSelection, QueryCategory,
};

pub use braid_gen::{
    CredentialStore, DisabledSearch, EnvCredentialStore, GenDelta, GenerationClient,
    GenerationRequest, GenError, OpenAiCompatClient, PageContent, SearchClient, SearchResult,
    StaticCredentialStore,
};

pub use braid_flow::{
    model_id, standard_flow, ClientFactory, EventSink, Flow, FlowBuilder, FlowContext, FlowHandle,
    FlowTimings, NextTask, Task, TaskResult, TaskTiming,
};

pub use braid_wire::{
    encode_frame, fallback_done_frame, normalize_text, FrameDecoder, FrameSender, ItemUpdate,
    PersistThrottle, StreamReducer,
};

pub use braid_store::{
    ChatStore, DeleteOutcome, LocalStore, MemoryStore, Preferences, StoreError, WriteBatcher,
};

#[cfg(feature = "mongodb")]
pub use braid_store::MongoStore;

pub use braid_sync::{
    select_channel, BroadcastChannel, ChangeChannel, ChangeKind, ChangeNote, HttpRemoteStore,
    PollingChannel, RemoteError, RemoteStore, RemoteSync, Subscription,
};
