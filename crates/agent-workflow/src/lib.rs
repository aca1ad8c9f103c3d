//! Multi-agent coordination for agent-rs
//!
//! The [`TaskCoordinator`] runs a set of analysis agents against an asset,
//! routing each agent to a model, reserving session budget, retrying and
//! falling back across providers, and reducing the verdicts into a
//! [`ConsensusReport`].

pub mod config;
pub mod consensus;
pub mod coordinator;
pub mod invocation;
pub mod report;

// Re-export for convenience
pub use config::{CoordinatorConfig, CoordinatorConfigBuilder, ExecutionOptions};
pub use consensus::{Consensus, reduce};
pub use coordinator::{SharedAgent, TaskCoordinator, TaskCoordinatorBuilder};
pub use invocation::{Invocation, InvocationContext, InvocationState};
pub use report::{AssetReports, ComparisonReport, ConsensusReport, RankedAsset};
