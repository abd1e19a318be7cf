use serde::{Deserialize, Serialize};

/// Upstream vendor behind a chat mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    OpenAi,
    Google,
    Anthropic,
    Fireworks,
}

impl Provider {
    /// Environment variable holding this provider's API key.
    pub fn env_key(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Google => "GEMINI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Fireworks => "FIREWORKS_API_KEY",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Google => "Google",
            Provider::Anthropic => "Anthropic",
            Provider::Fireworks => "Fireworks",
        }
    }
}

/// Named model/workflow configuration that handles a request.
///
/// `Auto` is not a concrete model: the Mode Resolver maps it to one of
/// the other variants based on query content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatMode {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    #[serde(rename = "o4-mini")]
    O4Mini,
    #[serde(rename = "gemini-flash")]
    GeminiFlash,
    #[serde(rename = "gemini-pro")]
    GeminiPro,
    #[serde(rename = "claude-sonnet")]
    ClaudeSonnet,
    #[serde(rename = "deepseek-r1")]
    DeepseekR1,
}

impl ChatMode {
    /// Provider backing this mode. `Auto` has none until resolved.
    pub fn provider(&self) -> Option<Provider> {
        match self {
            ChatMode::Auto => None,
            ChatMode::Gpt4o | ChatMode::Gpt4oMini | ChatMode::O4Mini => Some(Provider::OpenAi),
            ChatMode::GeminiFlash | ChatMode::GeminiPro => Some(Provider::Google),
            ChatMode::ClaudeSonnet => Some(Provider::Anthropic),
            ChatMode::DeepseekR1 => Some(Provider::Fireworks),
        }
    }

    /// Whether the backing model accepts image input.
    pub fn supports_image(&self) -> bool {
        matches!(
            self,
            ChatMode::Auto
                | ChatMode::Gpt4o
                | ChatMode::Gpt4oMini
                | ChatMode::GeminiFlash
                | ChatMode::GeminiPro
                | ChatMode::ClaudeSonnet
        )
    }

    /// Modes the Auto tier may substitute between when a provider has
    /// no usable credentials. Premium direct modes (`gpt-4o`,
    /// `gemini-pro`) are only ever used when requested explicitly and
    /// are never swapped out.
    pub fn auto_tier(&self) -> bool {
        matches!(
            self,
            ChatMode::Gpt4oMini
                | ChatMode::O4Mini
                | ChatMode::GeminiFlash
                | ChatMode::ClaudeSonnet
                | ChatMode::DeepseekR1
        )
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChatMode::Auto => "Auto",
            ChatMode::Gpt4o => "GPT-4o",
            ChatMode::Gpt4oMini => "GPT-4o mini",
            ChatMode::O4Mini => "o4-mini",
            ChatMode::GeminiFlash => "Gemini Flash",
            ChatMode::GeminiPro => "Gemini Pro",
            ChatMode::ClaudeSonnet => "Claude Sonnet",
            ChatMode::DeepseekR1 => "DeepSeek R1",
        }
    }

    /// Wire identifier, equal to the serde rename.
    pub fn slug(&self) -> &'static str {
        match self {
            ChatMode::Auto => "auto",
            ChatMode::Gpt4o => "gpt-4o",
            ChatMode::Gpt4oMini => "gpt-4o-mini",
            ChatMode::O4Mini => "o4-mini",
            ChatMode::GeminiFlash => "gemini-flash",
            ChatMode::GeminiPro => "gemini-pro",
            ChatMode::ClaudeSonnet => "claude-sonnet",
            ChatMode::DeepseekR1 => "deepseek-r1",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_serializes_to_slug() {
        let json = serde_json::to_string(&ChatMode::Gpt4oMini).unwrap();
        assert_eq!(json, "\"gpt-4o-mini\"");

        let back: ChatMode = serde_json::from_str("\"claude-sonnet\"").unwrap();
        assert_eq!(back, ChatMode::ClaudeSonnet);
    }

    #[test]
    fn auto_has_no_provider() {
        assert!(ChatMode::Auto.provider().is_none());
        assert_eq!(ChatMode::DeepseekR1.provider(), Some(Provider::Fireworks));
    }
}
