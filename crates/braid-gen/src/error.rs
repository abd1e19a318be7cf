use braid_types::Provider;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("No API key configured for {}", .0.display_name())]
    MissingCredentials(Provider),

    #[error("Rate limit exceeded")]
    RateLimited { authenticated: bool },

    #[error("Provider request failed: {0}")]
    Http(String),

    #[error("Provider returned an unexpected payload: {0}")]
    Payload(String),

    #[error("Stream read failed: {0}")]
    Stream(String),
}

impl GenError {
    /// User-facing message for the terminal error frame. Rate limits
    /// read differently depending on whether the user brought a key.
    pub fn user_message(&self) -> String {
        match self {
            GenError::MissingCredentials(provider) => format!(
                "{} is not configured. Set {} to use this model.",
                provider.display_name(),
                provider.env_key()
            ),
            GenError::RateLimited { authenticated: true } => {
                "You have hit the provider rate limit. Please retry in a moment.".to_string()
            }
            GenError::RateLimited {
                authenticated: false,
            } => "Rate limit reached. Sign in or add an API key to continue.".to_string(),
            other => other.to_string(),
        }
    }

    /// Transient errors may be retried by the calling task.
    pub fn is_transient(&self) -> bool {
        matches!(self, GenError::Http(_) | GenError::Stream(_))
    }
}

pub type Result<T> = std::result::Result<T, GenError>;
