//! Agent verdicts and per-agent results

use crate::{Error, ModelRef, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Upper bound of the confidence scale
pub const MAX_CONFIDENCE: f64 = 10.0;

/// Token usage reported by a provider call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Trading recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
}

impl Recommendation {
    pub const ALL: [Recommendation; 3] = [Self::Buy, Self::Hold, Self::Sell];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
        }
    }

    /// Signed direction: Buy = +1, Hold = 0, Sell = -1
    pub fn direction(&self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Hold => 0.0,
            Self::Sell => -1.0,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recommendation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "HOLD" => Ok(Self::Hold),
            "SELL" => Ok(Self::Sell),
            other => Err(Error::InvalidInput(format!("unknown recommendation: {other}"))),
        }
    }
}

/// Clamp a confidence score into `[0, 10]`; NaN becomes 0
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, MAX_CONFIDENCE)
    }
}

/// What an agent returns from a successful invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub rationale: String,
    pub usage: TokenUsage,
}

impl AgentOutput {
    pub fn new(
        recommendation: Recommendation,
        confidence: f64,
        rationale: impl Into<String>,
        usage: TokenUsage,
    ) -> Self {
        Self {
            recommendation,
            confidence: clamp_confidence(confidence),
            rationale: rationale.into(),
            usage,
        }
    }
}

/// Terminal state of one agent invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Ok,
    Failed,
    Skipped,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        })
    }
}

/// Outcome of one agent within an analysis request
///
/// `recommendation` and `confidence` are set only when `status` is
/// [`AgentStatus::Ok`]; `error` carries the failure or skip reason otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: String,
    pub status: AgentStatus,
    pub recommendation: Option<Recommendation>,
    pub confidence: Option<f64>,
    pub rationale: String,
    /// Cost committed for this agent, in USD
    pub cost: f64,
    pub model: Option<ModelRef>,
    pub attempts: u32,
    pub error: Option<String>,
}

impl AgentResult {
    pub fn ok(
        agent: impl Into<String>,
        output: AgentOutput,
        model: ModelRef,
        cost: f64,
        attempts: u32,
    ) -> Self {
        Self {
            agent: agent.into(),
            status: AgentStatus::Ok,
            recommendation: Some(output.recommendation),
            confidence: Some(clamp_confidence(output.confidence)),
            rationale: output.rationale,
            cost,
            model: Some(model),
            attempts,
            error: None,
        }
    }

    pub fn failed(
        agent: impl Into<String>,
        error: impl fmt::Display,
        model: Option<ModelRef>,
        cost: f64,
        attempts: u32,
    ) -> Self {
        Self {
            agent: agent.into(),
            status: AgentStatus::Failed,
            recommendation: None,
            confidence: None,
            rationale: String::new(),
            cost,
            model,
            attempts,
            error: Some(error.to_string()),
        }
    }

    pub fn skipped(agent: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self {
            agent: agent.into(),
            status: AgentStatus::Skipped,
            recommendation: None,
            confidence: None,
            rationale: String::new(),
            cost: 0.0,
            model: None,
            attempts: 0,
            error: Some(reason.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AgentStatus::Ok
    }

    /// Recommendation and confidence of a contributing result
    pub fn verdict(&self) -> Option<(Recommendation, f64)> {
        match (self.status, self.recommendation, self.confidence) {
            (AgentStatus::Ok, Some(rec), Some(conf)) => Some((rec, conf)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderId;

    fn model() -> ModelRef {
        ModelRef::new(ProviderId::OpenAI, "gpt-4o-mini")
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(clamp_confidence(12.0), 10.0);
        assert_eq!(clamp_confidence(-1.0), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(7.5), 7.5);

        let output = AgentOutput::new(Recommendation::Buy, 42.0, "strong", TokenUsage::default());
        assert_eq!(output.confidence, 10.0);
    }

    #[test]
    fn test_ok_result_carries_verdict() {
        let output = AgentOutput::new(
            Recommendation::Sell,
            6.0,
            "Margins are shrinking.",
            TokenUsage::new(900, 300),
        );
        let result = AgentResult::ok("fundamental", output, model(), 0.0003, 2);

        assert!(result.is_ok());
        assert_eq!(result.verdict(), Some((Recommendation::Sell, 6.0)));
        assert_eq!(result.attempts, 2);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_failed_and_skipped_have_no_verdict() {
        let failed = AgentResult::failed("technical", "timed out", Some(model()), 0.0, 3);
        assert_eq!(failed.status, AgentStatus::Failed);
        assert_eq!(failed.verdict(), None);
        assert_eq!(failed.error.as_deref(), Some("timed out"));

        let skipped = AgentResult::skipped("technical", "budget exhausted");
        assert_eq!(skipped.status, AgentStatus::Skipped);
        assert_eq!(skipped.verdict(), None);
        assert_eq!(skipped.attempts, 0);
    }

    #[test]
    fn test_recommendation_serde_and_direction() {
        assert_eq!(serde_json::to_string(&Recommendation::Buy).unwrap(), "\"BUY\"");
        assert_eq!("sell".parse::<Recommendation>().unwrap(), Recommendation::Sell);
        assert_eq!(Recommendation::Sell.direction(), -1.0);
        assert_eq!(Recommendation::Hold.direction(), 0.0);
    }
}
