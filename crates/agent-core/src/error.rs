//! Error types for agent-core

use crate::provider::{ModelRef, ProviderId};
use crate::TaskComplexity;
use thiserror::Error;

/// Result type alias for agent-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by routing, budgeting and coordination
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// No eligible model is served by an available provider
    #[error("No provider available for {complexity} task")]
    NoProviderAvailable { complexity: TaskComplexity },

    /// Candidates exist but none fits within the budget
    #[error("Budget exceeded: cheapest candidate costs ${cheapest:.6}, budget is ${budget:.6}")]
    BudgetExceeded { budget: f64, cheapest: f64 },

    /// The (provider, model) pair is not in the catalog
    #[error("Unknown model: {0}")]
    UnknownModel(ModelRef),

    /// Transient provider failure
    #[error("Provider {provider} error: {message}")]
    Provider {
        provider: ProviderId,
        message: String,
    },

    /// Provider call exceeded its deadline
    #[error("Provider {provider} timed out after {elapsed_ms}ms")]
    Timeout {
        provider: ProviderId,
        elapsed_ms: u64,
    },

    /// Not a single agent contributed a verdict
    #[error("Insufficient data for {asset}: none of {attempted} agents produced a verdict")]
    InsufficientData { asset: String, attempted: usize },

    /// Provider answered but the answer is unusable
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether the failed call may succeed when attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Timeout { .. })
    }

    /// Provider that produced this error, if any
    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            Self::Provider { provider, .. } | Self::Timeout { provider, .. } => Some(*provider),
            Self::UnknownModel(model) => Some(model.provider),
            _ => None,
        }
    }
}

impl From<agent_utils::ConfigError> for Error {
    fn from(err: agent_utils::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let provider = Error::Provider {
            provider: ProviderId::OpenAI,
            message: "503".into(),
        };
        let timeout = Error::Timeout {
            provider: ProviderId::Groq,
            elapsed_ms: 10,
        };
        assert!(provider.is_retryable());
        assert!(timeout.is_retryable());
        assert_eq!(timeout.provider(), Some(ProviderId::Groq));

        for err in [
            Error::MalformedResponse("no verdict".into()),
            Error::Config("bad".into()),
            Error::InvalidInput("bad".into()),
            Error::NoProviderAvailable {
                complexity: TaskComplexity::Critical,
            },
            Error::BudgetExceeded {
                budget: 0.001,
                cheapest: 0.002,
            },
        ] {
            assert!(!err.is_retryable(), "{err} should not be retryable");
        }
    }

    #[test]
    fn test_messages() {
        let err = Error::InsufficientData {
            asset: "AAPL".into(),
            attempted: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data for AAPL: none of 3 agents produced a verdict"
        );

        let err = Error::UnknownModel(ModelRef::new(ProviderId::OpenAI, "gpt-9"));
        assert_eq!(err.to_string(), "Unknown model: openai/gpt-9");
    }

    #[test]
    fn test_from_config_error() {
        let err: Error = agent_utils::ConfigError::Invalid("max_workers must be > 0".into()).into();
        assert!(matches!(err, Error::Config(msg) if msg.contains("max_workers")));
    }
}
