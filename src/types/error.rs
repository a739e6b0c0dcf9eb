use thiserror::Error;

/// suntrack error types
#[derive(Error, Debug)]
pub enum SuntrackError {
    /// Upstream provider call failed (auth, envelope flag, non-2xx, bad shape)
    #[error("provider {provider} failed: {cause}")]
    Provider { provider: String, cause: String },

    /// Provider pipeline exceeded its timeout
    #[error("provider {provider} timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    /// Transport error from the HTTP client
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse a payload or argument
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Operation not offered by a provider
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// No provider summary could be produced at all
    #[error("aggregate failed: {0}")]
    Aggregate(String),
}

impl SuntrackError {
    pub fn provider(provider: impl Into<String>, cause: impl ToString) -> Self {
        Self::Provider {
            provider: provider.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for suntrack
pub type Result<T> = std::result::Result<T, SuntrackError>;
