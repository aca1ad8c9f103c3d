//! Task complexity and the task types that map onto it

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How demanding a task is
///
/// The ordering is total: a model whose capability tier is at least the
/// requested complexity is eligible for the task. Model capability tiers use
/// the same scale (see [`CapabilityTier`]).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskComplexity {
    /// Quick lookups, simple queries
    Simple,
    /// Standard analysis
    #[default]
    Moderate,
    /// Deep analysis, reasoning
    Complex,
    /// High-stakes decisions
    Critical,
}

/// Capability tier of a model, on the same scale as [`TaskComplexity`]
pub type CapabilityTier = TaskComplexity;

impl TaskComplexity {
    /// All levels, lowest first
    pub const ALL: [TaskComplexity; 4] = [
        Self::Simple,
        Self::Moderate,
        Self::Complex,
        Self::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
            Self::Critical => "critical",
        }
    }

    /// Whether a model of this tier may serve a task of `complexity`
    pub fn covers(&self, complexity: TaskComplexity) -> bool {
        *self >= complexity
    }
}

impl fmt::Display for TaskComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskComplexity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "moderate" => Ok(Self::Moderate),
            "complex" => Ok(Self::Complex),
            "critical" => Ok(Self::Critical),
            other => Err(Error::InvalidInput(format!("unknown complexity: {other}"))),
        }
    }
}

/// Kind of task a caller asks a model recommendation for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    QuickLookup,
    Screening,
    Comparison,
    Analysis,
    DeepAnalysis,
    /// Anything not listed above
    Other,
}

impl TaskType {
    pub fn complexity(&self) -> TaskComplexity {
        match self {
            Self::QuickLookup | Self::Screening => TaskComplexity::Simple,
            Self::Comparison | Self::Other => TaskComplexity::Moderate,
            Self::Analysis => TaskComplexity::Complex,
            Self::DeepAnalysis => TaskComplexity::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuickLookup => "quick_lookup",
            Self::Screening => "screening",
            Self::Comparison => "comparison",
            Self::Analysis => "analysis",
            Self::DeepAnalysis => "deep_analysis",
            Self::Other => "other",
        }
    }
}

impl From<&str> for TaskType {
    /// Unrecognized task types fall back to [`TaskType::Other`]
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "quick_lookup" => Self::QuickLookup,
            "screening" => Self::Screening,
            "comparison" => Self::Comparison,
            "analysis" => Self::Analysis,
            "deep_analysis" => Self::DeepAnalysis,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
