use thiserror::Error;

/// Failures talking to the remote store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Credentials rejected. Sync downgrades to local-only; the error
    /// state is surfaced to the user rather than retried.
    #[error("remote store rejected credentials")]
    Unauthorized,

    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, RemoteError>;
