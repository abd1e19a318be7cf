pub mod events;
pub mod item;
pub mod mode;
pub mod request;
pub mod thread;

pub use events::{AnswerDelta, ChatEvent, DoneStatus, EventEnvelope};
pub use item::{
    Answer, ItemStatus, Source, StepState, StepStatus, ThreadItem, ToolCall, ToolResult,
};
pub use mode::{ChatMode, Provider};
pub use request::{ChatMessage, CompletionRequest, MessageRole};
pub use thread::Thread;
