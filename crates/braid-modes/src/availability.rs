use braid_gen::CredentialStore;
use braid_types::{ChatMode, Provider};

use crate::error::ModeError;
use crate::resolver::resolve;

/// Outcome of the availability check: the mode to actually run, and the
/// substitution notice when the original choice could not be served.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeDecision {
    pub mode: ChatMode,
    pub changed: bool,
    pub message: Option<String>,
}

const ALL_PROVIDERS: &[Provider] = &[
    Provider::OpenAi,
    Provider::Google,
    Provider::Anthropic,
    Provider::Fireworks,
];

/// Check that the resolved mode's provider has usable credentials and
/// substitute a same-family fallback when it does not.
///
/// Only Auto-tier modes are substitutable; a directly requested premium
/// mode fails instead. When no provider at all can serve the request
/// this returns a terminal configuration error that must reach the
/// user.
pub fn ensure_provider_availability(
    mode: ChatMode,
    query: &str,
    has_image: bool,
    credentials: &dyn CredentialStore,
) -> Result<ModeDecision, ModeError> {
    // `Auto` reaching this point means the caller skipped resolution.
    let mode = if mode == ChatMode::Auto {
        resolve(query, has_image).mode
    } else {
        mode
    };

    if serves(mode, has_image, credentials) {
        return Ok(ModeDecision {
            mode,
            changed: false,
            message: None,
        });
    }

    if mode.auto_tier() {
        let selection = resolve(query, has_image);
        let fallback = selection
            .category
            .fallback_modes()
            .iter()
            .copied()
            .find(|candidate| *candidate != mode && serves(*candidate, has_image, credentials));

        if let Some(fallback) = fallback {
            tracing::debug!(
                from = mode.slug(),
                to = fallback.slug(),
                "substituting fallback mode"
            );
            return Ok(ModeDecision {
                mode: fallback,
                changed: true,
                message: Some(format!(
                    "Switched to {} because {} has no API key configured",
                    fallback.display_name(),
                    mode.provider()
                        .map(|p| p.display_name())
                        .unwrap_or("the selected provider"),
                )),
            });
        }
    }

    let any_key = ALL_PROVIDERS
        .iter()
        .any(|provider| credentials.has_key(*provider));
    if has_image && any_key {
        return Err(ModeError::ImageUnsupported);
    }

    let hint = match mode.provider() {
        Some(provider) => format!(
            "Set {} to use {}.",
            provider.env_key(),
            mode.display_name()
        ),
        None => "Set an API key for at least one provider.".to_string(),
    };
    Err(ModeError::NoProviderConfigured { hint })
}

fn serves(mode: ChatMode, has_image: bool, credentials: &dyn CredentialStore) -> bool {
    let Some(provider) = mode.provider() else {
        return false;
    };
    if has_image && !mode.supports_image() {
        return false;
    }
    credentials.has_key(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_gen::StaticCredentialStore;

    #[test]
    fn configured_provider_keeps_mode() {
        let creds = StaticCredentialStore::new().with_key(Provider::Anthropic, "key");
        let decision = ensure_provider_availability(
            ChatMode::ClaudeSonnet,
            "fix this bug in my python function",
            false,
            &creds,
        )
        .unwrap();
        assert_eq!(decision.mode, ChatMode::ClaudeSonnet);
        assert!(!decision.changed);
        assert!(decision.message.is_none());
    }

    #[test]
    fn auto_tier_substitutes_across_providers() {
        let creds = StaticCredentialStore::new().with_key(Provider::OpenAi, "key");
        let decision = ensure_provider_availability(
            ChatMode::ClaudeSonnet,
            "fix this bug in my python function",
            false,
            &creds,
        )
        .unwrap();
        assert!(decision.changed);
        assert_eq!(decision.mode.provider(), Some(Provider::OpenAi));
        assert!(decision.message.unwrap().contains("Anthropic"));
    }

    #[test]
    fn no_credentials_anywhere_is_a_config_error() {
        let creds = StaticCredentialStore::new();
        let err = ensure_provider_availability(ChatMode::Auto, "hello", false, &creds)
            .unwrap_err();
        match err {
            ModeError::NoProviderConfigured { hint } => {
                assert!(hint.contains("API_KEY"), "hint should name the env var: {hint}");
            }
            other => panic!("expected NoProviderConfigured, got {other:?}"),
        }
    }

    #[test]
    fn image_with_no_vision_capable_provider_errors() {
        // Fireworks is configured but deepseek-r1 has no vision support.
        let creds = StaticCredentialStore::new().with_key(Provider::Fireworks, "key");
        let err =
            ensure_provider_availability(ChatMode::Auto, "what is in this photo", true, &creds)
                .unwrap_err();
        assert_eq!(err, ModeError::ImageUnsupported);
    }

    #[test]
    fn premium_mode_is_not_substituted() {
        let creds = StaticCredentialStore::new().with_key(Provider::Anthropic, "key");
        let err = ensure_provider_availability(ChatMode::Gpt4o, "hello", false, &creds)
            .unwrap_err();
        assert!(matches!(err, ModeError::NoProviderConfigured { .. }));
    }
}
