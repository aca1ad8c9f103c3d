//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, Result};
use agent_core::ProviderId;
use async_trait::async_trait;

/// Trait for LLM providers
///
/// Implementations of this trait provide access to one hosted LLM service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Which provider this backend talks to
    fn id(&self) -> ProviderId;

    /// Get the provider name (e.g., "anthropic", "openai")
    fn name(&self) -> &str {
        self.id().as_str()
    }
}
