//! Verdict extraction from free-text analyst responses
//!
//! An explicit `RECOMMENDATION:` line wins. Otherwise the text is scanned
//! for the keywords BUY, SELL and HOLD, in that order of precedence.
//! Confidence comes from a `CONFIDENCE:` value, an `N/10` score or a
//! percentage, and defaults to 5 when none is present.

use agent_core::{Error, Recommendation, Result, clamp_confidence};
use regex::Regex;

/// Confidence assumed when the response states none
pub const DEFAULT_CONFIDENCE: f64 = 5.0;

/// Recommendation and confidence read from a response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedVerdict {
    pub recommendation: Recommendation,
    pub confidence: f64,
}

/// Compiled verdict patterns
#[derive(Debug, Clone)]
pub struct VerdictParser {
    explicit: Regex,
    keywords: [(Recommendation, Regex); 3],
    confidence_line: Regex,
    out_of_ten: Regex,
    percent: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Config(format!("invalid verdict pattern: {e}")))
}

impl VerdictParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            explicit: compile(
                r"(?im)^[\s*#>_-]*(?:final\s+)?(?:recommendation|signal|verdict|rating)[\s*_]*[:=-][\s*_]*(?:strong\s+)?(buy|sell|hold)\b",
            )?,
            keywords: [
                (Recommendation::Buy, compile(r"(?i)\bbuy\b")?),
                (Recommendation::Sell, compile(r"(?i)\bsell\b")?),
                (Recommendation::Hold, compile(r"(?i)\bhold\b")?),
            ],
            confidence_line: compile(
                r"(?i)confidence(?:\s+level)?[\s*_]*[:=-]?[\s*_]*(\d+(?:\.\d+)?)\s*(%|/\s*100\b|/\s*10\b)?",
            )?,
            out_of_ten: compile(r"(\d+(?:\.\d+)?)\s*/\s*10\b")?,
            percent: compile(r"(?i)(\d+(?:\.\d+)?)\s*%\s*confiden")?,
        })
    }

    /// Parse a response; fails with `MalformedResponse` when no
    /// recommendation can be recognised
    pub fn parse(&self, text: &str) -> Result<ParsedVerdict> {
        let recommendation = self.recommendation(text).ok_or_else(|| {
            Error::MalformedResponse(format!(
                "no BUY/HOLD/SELL recommendation in response: {}",
                excerpt(text)
            ))
        })?;

        Ok(ParsedVerdict {
            recommendation,
            confidence: clamp_confidence(self.confidence(text).unwrap_or(DEFAULT_CONFIDENCE)),
        })
    }

    fn recommendation(&self, text: &str) -> Option<Recommendation> {
        if let Some(caps) = self.explicit.captures(text) {
            return caps[1].parse().ok();
        }
        self.keywords
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(rec, _)| *rec)
    }

    fn confidence(&self, text: &str) -> Option<f64> {
        if let Some(caps) = self.confidence_line.captures(text) {
            let value: f64 = caps[1].parse().ok()?;
            let scale = caps.get(2).map(|m| m.as_str().trim_start_matches('/').trim());
            return Some(match scale {
                Some("%" | "100") => value / 10.0,
                Some(_) => value,
                // A bare value above the 0-10 scale reads as a percentage
                None if value > 10.0 && value <= 100.0 => value / 10.0,
                None => value,
            });
        }
        if let Some(caps) = self.out_of_ten.captures(text) {
            return caps[1].parse().ok();
        }
        if let Some(caps) = self.percent.captures(text) {
            return caps[1].parse::<f64>().ok().map(|p| p / 10.0);
        }
        None
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > 80 {
        format!("{}...", trimmed.chars().take(80).collect::<String>())
    } else {
        trimmed.to_string()
    }
}
