//! Analyst agent kinds

mod prompts;

use agent_core::{AssetClass, Error, Result, TaskComplexity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The analysts that can take part in a consensus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Generalist covering fundamentals, technicals and flow
    StockAnalyst,
    /// Market, on-chain and tokenomics analysis
    CryptoAnalyst,
    /// Chart patterns and indicators
    Technical,
    /// Financial statements and valuation
    Fundamental,
}

impl AgentKind {
    pub const ALL: [Self; 4] = [
        Self::StockAnalyst,
        Self::CryptoAnalyst,
        Self::Technical,
        Self::Fundamental,
    ];

    /// Agent name reported in results
    pub fn name(self) -> &'static str {
        match self {
            Self::StockAnalyst => "stock_analyst",
            Self::CryptoAnalyst => "crypto_analyst",
            Self::Technical => "technical",
            Self::Fundamental => "fundamental",
        }
    }

    /// Routing complexity of this analyst's task
    pub fn complexity(self) -> TaskComplexity {
        match self {
            Self::Fundamental => TaskComplexity::Complex,
            Self::StockAnalyst | Self::CryptoAnalyst | Self::Technical => {
                TaskComplexity::Moderate
            }
        }
    }

    /// Whether this analyst can cover the asset class
    pub fn supports(self, class: AssetClass) -> bool {
        match self {
            Self::StockAnalyst | Self::Fundamental => class == AssetClass::Stock,
            Self::CryptoAnalyst => class == AssetClass::Crypto,
            Self::Technical => true,
        }
    }

    /// Analysts consulted for an asset class when none are named
    pub fn default_set(class: AssetClass) -> Vec<Self> {
        match class {
            AssetClass::Stock => vec![Self::Fundamental, Self::Technical, Self::StockAnalyst],
            AssetClass::Crypto => vec![Self::CryptoAnalyst, Self::Technical],
        }
    }

    pub fn system_prompt(self) -> String {
        prompts::system(self)
    }

    pub fn user_prompt(self, symbol: &str) -> String {
        prompts::user(self, symbol)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "stock_analyst" | "stock" => Ok(Self::StockAnalyst),
            "crypto_analyst" | "crypto" => Ok(Self::CryptoAnalyst),
            "technical" => Ok(Self::Technical),
            "fundamental" => Ok(Self::Fundamental),
            other => Err(Error::InvalidInput(format!("unknown agent: {other}"))),
        }
    }
}
