use std::sync::Arc;

use braid_gen::{GenError, GenerationClient};
use braid_types::ChatMode;

/// Resolves the generation client for a mode. Provider-specific wiring
/// (base URLs, API keys) stays at the application level; tasks only see
/// this seam.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, mode: ChatMode) -> Result<Arc<dyn GenerationClient>, GenError>;
}

/// Upstream model identifier sent on the wire for each mode.
pub fn model_id(mode: ChatMode) -> &'static str {
    match mode {
        // `Auto` never reaches generation; the router resolves it first.
        ChatMode::Auto => "gpt-4o-mini",
        ChatMode::Gpt4o => "gpt-4o",
        ChatMode::Gpt4oMini => "gpt-4o-mini",
        ChatMode::O4Mini => "o4-mini",
        ChatMode::GeminiFlash => "gemini-2.5-flash",
        ChatMode::GeminiPro => "gemini-2.5-pro",
        ChatMode::ClaudeSonnet => "claude-sonnet-4",
        ChatMode::DeepseekR1 => "accounts/fireworks/models/deepseek-r1",
    }
}
