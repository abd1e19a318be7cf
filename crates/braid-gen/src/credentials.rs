use std::collections::HashMap;

use braid_types::Provider;

/// Read-only view over provider API keys. The Mode Resolver consults
/// this before committing to a mode; generation clients read the key at
/// request time.
pub trait CredentialStore: Send + Sync {
    fn key(&self, provider: Provider) -> Option<String>;

    fn has_key(&self, provider: Provider) -> bool {
        self.key(provider).is_some()
    }
}

/// Keys sourced from the process environment (`OPENAI_API_KEY` etc.).
#[derive(Debug, Default, Clone)]
pub struct EnvCredentialStore;

impl CredentialStore for EnvCredentialStore {
    fn key(&self, provider: Provider) -> Option<String> {
        std::env::var(provider.env_key())
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Fixed key set, used in tests and for per-request user keys.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentialStore {
    keys: HashMap<Provider, String>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.keys.insert(provider, key.into());
        self
    }
}

impl CredentialStore for StaticCredentialStore {
    fn key(&self, provider: Provider) -> Option<String> {
        self.keys.get(&provider).cloned()
    }
}
