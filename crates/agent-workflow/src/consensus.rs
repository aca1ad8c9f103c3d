//! Consensus reduction over agent verdicts
//!
//! The majority recommendation is the mode of the contributing verdicts; any
//! tie for the mode resolves to Hold. Confidence is the arithmetic mean and
//! agreement is the share of contributors that voted for the majority.

use agent_core::{AgentResult, Error, Recommendation, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated verdict of a set of agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    pub recommendation: Recommendation,
    pub confidence: f64,
    /// Fraction of contributors agreeing with `recommendation`
    pub agreement: f64,
    /// Votes per recommendation; sums to the number of contributors
    pub breakdown: BTreeMap<Recommendation, usize>,
    /// The Hold tie-break decided the verdict
    pub tie_broken: bool,
}

impl Consensus {
    pub fn contributors(&self) -> usize {
        self.breakdown.values().sum()
    }
}

/// Reduce agent results into a consensus
///
/// Only results with status Ok contribute. The outcome does not depend on
/// the order of `results`. Fails with `InsufficientData` when nothing
/// contributes.
pub fn reduce(asset: &str, results: &[AgentResult]) -> Result<Consensus> {
    let mut verdicts: Vec<(&str, Recommendation, f64)> = results
        .iter()
        .filter_map(|r| r.verdict().map(|(rec, conf)| (r.agent.as_str(), rec, conf)))
        .collect();

    if verdicts.is_empty() {
        return Err(Error::InsufficientData {
            asset: asset.to_string(),
            attempted: results.len(),
        });
    }

    // Fixed summation order keeps the mean bit-identical across arrival orders
    verdicts.sort_by(|a, b| a.0.cmp(b.0).then(a.1.cmp(&b.1)).then(a.2.total_cmp(&b.2)));

    let mut breakdown: BTreeMap<Recommendation, usize> =
        Recommendation::ALL.iter().map(|&rec| (rec, 0)).collect();
    for (_, rec, _) in &verdicts {
        *breakdown.entry(*rec).or_default() += 1;
    }

    let top = breakdown.values().copied().max().unwrap_or(0);
    let leaders: Vec<Recommendation> = breakdown
        .iter()
        .filter(|(_, count)| **count == top)
        .map(|(rec, _)| *rec)
        .collect();

    let (recommendation, tie_broken) = match leaders.as_slice() {
        [single] => (*single, false),
        _ => (Recommendation::Hold, true),
    };

    let total = verdicts.len();
    let confidence = verdicts.iter().map(|(_, _, conf)| conf).sum::<f64>() / total as f64;
    let agreement = breakdown[&recommendation] as f64 / total as f64;

    Ok(Consensus {
        recommendation,
        confidence,
        agreement,
        breakdown,
        tie_broken,
    })
}
