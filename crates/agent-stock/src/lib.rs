//! Financial analyst agents for agent-rs
//!
//! Each analyst is an [`agent_core::AgentInvoker`] that prompts the model the
//! router picked and reads a BUY/HOLD/SELL verdict with a confidence score
//! out of the response:
//!
//! - `StockAnalyst`: comprehensive equity analysis
//! - `CryptoAnalyst`: market, on-chain and tokenomics analysis
//! - `Technical`: trend, indicators and price levels
//! - `Fundamental`: statements, ratios and intrinsic value
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_stock::{AgentKind, AnalystConfig, LlmAnalyst};
//! use agent_core::Asset;
//! use agent_llm::{ProviderRegistry, ProvidersConfig};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(ProviderRegistry::from_env(&ProvidersConfig::default())?);
//! let asset = Asset::stock("AAPL")?;
//! let agents = LlmAnalyst::set_for(
//!     &asset,
//!     &AgentKind::default_set(asset.class),
//!     &registry,
//!     &Arc::new(AnalystConfig::default()),
//! )?;
//! ```

pub mod agents;
pub mod analyst;
pub mod config;
pub mod verdict;

// Re-export main types for convenience
pub use agents::AgentKind;
pub use analyst::LlmAnalyst;
pub use config::{AnalystConfig, AnalystConfigBuilder};
pub use verdict::{DEFAULT_CONFIDENCE, ParsedVerdict, VerdictParser};
