//! Provider wiring. Every catalog provider speaks the OpenAI
//! chat-completions shape behind its own base URL, so one client type
//! covers all of them; only base URL and key differ per mode.

use std::sync::Arc;

use braid_flow::ClientFactory;
use braid_gen::{CredentialStore, GenError, GenerationClient, OpenAiCompatClient};
use braid_types::{ChatMode, Provider};

fn base_url(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAi => "https://api.openai.com/v1",
        Provider::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
        Provider::Anthropic => "https://api.anthropic.com/v1",
        Provider::Fireworks => "https://api.fireworks.ai/inference/v1",
    }
}

/// Builds a generation client for whichever mode the router settled on,
/// reading the provider key at request time.
pub struct ProviderClientFactory {
    credentials: Arc<dyn CredentialStore>,
}

impl ProviderClientFactory {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }
}

impl ClientFactory for ProviderClientFactory {
    fn client_for(&self, mode: ChatMode) -> Result<Arc<dyn GenerationClient>, GenError> {
        let provider = mode
            .provider()
            .ok_or_else(|| GenError::Payload("mode has no provider".to_string()))?;
        let key = self
            .credentials
            .key(provider)
            .ok_or(GenError::MissingCredentials(provider))?;
        let client = OpenAiCompatClient::with_base_url(key, base_url(provider))?;
        Ok(Arc::new(client))
    }
}
