//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust
//! use braid::prelude::*;
//! ```

pub use crate::{
    standard_flow, AnswerDelta, ChatEvent, ChatMessage, ChatMode, ChatStore, ClientFactory,
    CompletionRequest, CredentialStore, DoneStatus, EnvCredentialStore, EventEnvelope, EventSink,
    Flow, FlowBuilder, FlowContext, GenerationClient, ItemStatus, LocalStore, MemoryStore,
    NextTask, Provider, SearchClient, StreamReducer, Task, TaskResult, Thread, ThreadItem,
};
