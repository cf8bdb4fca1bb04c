use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("Missing API key for provider '{0}'. Set it in fathom.toml or the provider's environment variable.")]
    MissingApiKey(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited. Try again later.")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

impl LLMError {
    /// True when no usable model connection can exist with the current
    /// configuration: missing credentials or settings, an unknown provider,
    /// or credentials the API rejected.
    pub fn is_configuration(&self) -> bool {
        match self {
            LLMError::MissingApiKey(_) | LLMError::MissingConfig(_) | LLMError::UnknownProvider(_) => {
                true
            }
            LLMError::ApiError { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::Network(err.to_string())
    }
}
