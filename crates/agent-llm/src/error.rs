//! Error types for LLM operations

use agent_core::{ModelRef, ProviderId};
use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// No backend registered for the provider
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(ProviderId),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LLMError {
    /// Translate into the shared taxonomy, attributing the error to `model`.
    /// Retry decisions are made on the translated error only.
    pub fn into_core(self, model: &ModelRef) -> agent_core::Error {
        use agent_core::Error;

        let provider = model.provider;
        match self {
            Self::HttpError(e) if e.is_timeout() => Error::Timeout {
                provider,
                elapsed_ms: 0,
            },
            Self::ModelNotFound(_) => Error::UnknownModel(model.clone()),
            Self::UnexpectedResponse(msg) => Error::MalformedResponse(msg),
            Self::SerializationError(e) => Error::MalformedResponse(e.to_string()),
            Self::InvalidRequest(msg) => Error::InvalidInput(msg),
            err @ (Self::AuthenticationFailed
            | Self::ConfigurationError(_)
            | Self::ProviderNotConfigured(_)) => Error::Config(format!("{provider}: {err}")),
            other => Error::Provider {
                provider,
                message: other.to_string(),
            },
        }
    }
}
