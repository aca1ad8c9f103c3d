//! Core vocabulary for agent-rs
//!
//! Provider identifiers, task complexity, agent verdicts and results, the
//! shared error taxonomy, and the [`AgentInvoker`] trait every analysis
//! agent implements.

pub mod asset;
pub mod complexity;
pub mod error;
pub mod invoker;
pub mod provider;
pub mod verdict;

pub use asset::{Asset, AssetClass};
pub use complexity::{CapabilityTier, TaskComplexity, TaskType};
pub use error::{Error, Result};
pub use invoker::{AgentInvoker, DEFAULT_ESTIMATED_USAGE};
pub use provider::{ModelRef, ProviderId};
pub use verdict::{
    AgentOutput, AgentResult, AgentStatus, MAX_CONFIDENCE, Recommendation, TokenUsage,
    clamp_confidence,
};
