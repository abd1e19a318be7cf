use braid_types::ChatMode;
use serde::{Deserialize, Serialize};

/// Single storage key the preferences blob lives under.
pub const PREFERENCES_KEY: &str = "braid.preferences";

/// Per-client configuration blob, persisted as one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_mode: Option<ChatMode>,
    #[serde(default)]
    pub web_search: bool,
    #[serde(default)]
    pub show_suggestions: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_thread_id: Option<String>,
}
