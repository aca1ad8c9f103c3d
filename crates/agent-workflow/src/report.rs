//! Consensus and comparison reports

use crate::consensus::Consensus;
use agent_core::{AgentResult, AgentStatus, Asset, Recommendation, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Longest rationale excerpt shown in a summary line
const SUMMARY_EXCERPT_CHARS: usize = 160;

/// Result of one comprehensive analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusReport {
    pub request_id: Uuid,
    pub asset: Asset,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub agreement: f64,
    pub breakdown: BTreeMap<Recommendation, usize>,
    /// The Hold tie-break decided the verdict
    pub tie_broken: bool,
    /// Every agent's outcome, ordered by agent name
    pub results: Vec<AgentResult>,
    /// USD committed across all agents
    pub total_cost: f64,
    pub generated_at: DateTime<Utc>,
}

impl ConsensusReport {
    pub fn new(
        request_id: Uuid,
        asset: Asset,
        consensus: Consensus,
        results: Vec<AgentResult>,
    ) -> Self {
        let total_cost = results.iter().map(|r| r.cost).sum();
        Self {
            request_id,
            asset,
            recommendation: consensus.recommendation,
            confidence: consensus.confidence,
            agreement: consensus.agreement,
            breakdown: consensus.breakdown,
            tie_broken: consensus.tie_broken,
            results,
            total_cost,
            generated_at: Utc::now(),
        }
    }

    /// Ranking score: direction x confidence x agreement
    pub fn score(&self) -> f64 {
        self.recommendation.direction() * self.confidence * self.agreement
    }

    /// Number of results with the given status
    pub fn count(&self, status: AgentStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// One line per agent: its first rationale sentence, or why it has none
    pub fn summary(&self) -> String {
        self.results
            .iter()
            .map(|result| match result.status {
                AgentStatus::Ok => {
                    let verdict = result
                        .recommendation
                        .map(|r| r.to_string())
                        .unwrap_or_default();
                    format!(
                        "{} [{verdict}]: {}",
                        result.agent,
                        first_sentence(&result.rationale)
                    )
                }
                AgentStatus::Failed => format!(
                    "{}: failed ({})",
                    result.agent,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
                AgentStatus::Skipped => format!(
                    "{}: skipped ({})",
                    result.agent,
                    result.error.as_deref().unwrap_or("not dispatched")
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn first_sentence(text: &str) -> String {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|&(i, c)| {
            c == '\n' || (matches!(c, '.' | '!' | '?') && text[i + c.len_utf8()..].starts_with(char::is_whitespace))
        })
        .map_or(text.len(), |(i, c)| if c == '\n' { i } else { i + c.len_utf8() });

    let sentence = text[..end].trim();
    if sentence.chars().count() > SUMMARY_EXCERPT_CHARS {
        let cut: String = sentence.chars().take(SUMMARY_EXCERPT_CHARS).collect();
        format!("{cut}...")
    } else {
        sentence.to_string()
    }
}

/// Per-asset outcomes of a batch or comparison, keyed by symbol
pub type AssetReports = BTreeMap<String, Result<ConsensusReport>>;

/// One row of a comparison ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAsset {
    pub symbol: String,
    pub score: f64,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub agreement: f64,
}

/// Result of comparing several assets
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub reports: AssetReports,
    /// Successfully analysed assets, best score first, ties by symbol
    pub ranking: Vec<RankedAsset>,
}

impl ComparisonReport {
    pub fn new(reports: AssetReports) -> Self {
        let ranking = rank(&reports);
        Self { reports, ranking }
    }

    /// Highest ranked asset, if any analysis succeeded
    pub fn best(&self) -> Option<&RankedAsset> {
        self.ranking.first()
    }
}

fn rank(reports: &AssetReports) -> Vec<RankedAsset> {
    let mut ranking: Vec<RankedAsset> = reports
        .iter()
        .filter_map(|(symbol, outcome)| outcome.as_ref().ok().map(|report| (symbol, report)))
        .map(|(symbol, report)| RankedAsset {
            symbol: symbol.clone(),
            score: report.score(),
            recommendation: report.recommendation,
            confidence: report.confidence,
            agreement: report.agreement,
        })
        .collect();

    ranking.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.symbol.cmp(&b.symbol)));
    ranking
}
