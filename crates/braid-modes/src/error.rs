use thiserror::Error;

/// Configuration failures raised while committing to a mode. These are
/// terminal and user-visible; the caller must not swallow or retry
/// them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModeError {
    #[error("No AI provider is configured. {hint}")]
    NoProviderConfigured { hint: String },

    #[error("None of the configured providers can process image attachments")]
    ImageUnsupported,
}
