//! The Agent Invoker trait

use crate::{AgentOutput, Asset, ModelRef, Result, TaskComplexity, TokenUsage};
use async_trait::async_trait;

/// Token usage assumed for budget reservations when an agent does not say
pub const DEFAULT_ESTIMATED_USAGE: TokenUsage = TokenUsage {
    input_tokens: 1000,
    output_tokens: 500,
};

/// An analysis agent the coordinator can dispatch
///
/// Implementations run one analysis of `asset` on the model picked by the
/// router. Transient failures must surface as [`crate::Error::Provider`] or
/// [`crate::Error::Timeout`] so the coordinator retries them.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Stable agent name; results are ordered by it
    fn name(&self) -> &str;

    /// Run the analysis
    async fn invoke(&self, asset: &Asset, model: &ModelRef) -> Result<AgentOutput>;

    /// Complexity used to route this agent
    fn complexity(&self) -> TaskComplexity {
        TaskComplexity::Moderate
    }

    /// Usage the budget reservation is computed from
    fn estimated_usage(&self) -> TokenUsage {
        DEFAULT_ESTIMATED_USAGE
    }
}
