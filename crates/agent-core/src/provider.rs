//! LLM provider identifiers
//!
//! Providers form a closed set. Adding one means adding a variant here,
//! a catalog row in `agent-llm`, and a backend in the provider registry.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
    Groq,
    Google,
}

impl ProviderId {
    /// Every known provider, in declaration order
    pub const ALL: [ProviderId; 4] = [Self::OpenAI, Self::Anthropic, Self::Groq, Self::Google];

    /// Lowercase identifier used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Groq => "groq",
            Self::Google => "google",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn credential_env_var(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Google => "GOOGLE_API_KEY",
        }
    }

    /// Cheapest general-purpose model offered by this provider
    pub fn fallback_model(&self) -> &'static str {
        match self {
            Self::OpenAI => "gpt-4o-mini",
            Self::Anthropic => "claude-3-5-haiku-20241022",
            Self::Groq => "llama-3.1-8b-instant",
            Self::Google => "gemini-2.0-flash-exp",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "groq" => Ok(Self::Groq),
            "google" | "gemini" => Ok(Self::Google),
            other => Err(Error::InvalidInput(format!("unknown provider: {other}"))),
        }
    }
}

/// A concrete (provider, model) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: ProviderId,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

impl FromStr for ModelRef {
    type Err = Error;

    /// Parse `provider/model`
    fn from_str(s: &str) -> Result<Self> {
        let (provider, model) = s.split_once('/').ok_or_else(|| {
            Error::InvalidInput(format!("expected provider/model, got '{s}'"))
        })?;
        if model.is_empty() {
            return Err(Error::InvalidInput(format!("empty model name in '{s}'")));
        }
        Ok(Self::new(provider.parse()?, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_is_case_insensitive() {
        assert_eq!("OpenAI".parse::<ProviderId>().unwrap(), ProviderId::OpenAI);
        assert_eq!("ANTHROPIC".parse::<ProviderId>().unwrap(), ProviderId::Anthropic);
        assert_eq!(" groq ".parse::<ProviderId>().unwrap(), ProviderId::Groq);
        assert_eq!("gemini".parse::<ProviderId>().unwrap(), ProviderId::Google);
        assert!(matches!(
            "mistral".parse::<ProviderId>(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_provider_serde_names() {
        let json = serde_json::to_string(&ProviderId::OpenAI).unwrap();
        assert_eq!(json, "\"openai\"");
        let parsed: ProviderId = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(parsed, ProviderId::Anthropic);
    }

    #[test]
    fn test_model_ref_display_and_parse() {
        let model = ModelRef::new(ProviderId::Groq, "llama-3.3-70b-versatile");
        assert_eq!(model.to_string(), "groq/llama-3.3-70b-versatile");
        assert_eq!(model.to_string().parse::<ModelRef>().unwrap(), model);

        assert!("gpt-4o".parse::<ModelRef>().is_err());
        assert!("openai/".parse::<ModelRef>().is_err());
    }

    #[test]
    fn test_credentials_are_distinct() {
        let vars: std::collections::HashSet<_> =
            ProviderId::ALL.iter().map(ProviderId::credential_env_var).collect();
        assert_eq!(vars.len(), ProviderId::ALL.len());
    }
}
