//! Configuration for analyst agents

use agent_core::{Error, Result, TaskComplexity, TokenUsage};
use serde::{Deserialize, Serialize};

/// Settings shared by the LLM-backed analysts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystConfig {
    /// Sampling temperature
    pub temperature: f32,

    /// Completion length limit
    pub max_tokens: usize,

    /// Prompt size assumed for budget reservations
    pub estimated_input_tokens: u32,

    /// Completion size assumed for budget reservations
    pub estimated_output_tokens: u32,

    /// Route every analyst at this complexity instead of its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<TaskComplexity>,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 1024,
            estimated_input_tokens: 1000,
            estimated_output_tokens: 500,
            complexity: None,
        }
    }
}

impl AnalystConfig {
    /// Create a new configuration builder
    pub fn builder() -> AnalystConfigBuilder {
        AnalystConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }

        if self.max_tokens == 0 {
            return Err(Error::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Usage a single analysis is budgeted at
    pub fn estimated_usage(&self) -> TokenUsage {
        TokenUsage::new(self.estimated_input_tokens, self.estimated_output_tokens)
    }
}

/// Builder for AnalystConfig
#[derive(Debug, Default)]
pub struct AnalystConfigBuilder {
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    estimated_input_tokens: Option<u32>,
    estimated_output_tokens: Option<u32>,
    complexity: Option<TaskComplexity>,
}

impl AnalystConfigBuilder {
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the usage budget reservations are computed from
    pub fn estimated_usage(mut self, usage: TokenUsage) -> Self {
        self.estimated_input_tokens = Some(usage.input_tokens);
        self.estimated_output_tokens = Some(usage.output_tokens);
        self
    }

    pub fn complexity(mut self, complexity: TaskComplexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AnalystConfig> {
        let defaults = AnalystConfig::default();

        let config = AnalystConfig {
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            estimated_input_tokens: self
                .estimated_input_tokens
                .unwrap_or(defaults.estimated_input_tokens),
            estimated_output_tokens: self
                .estimated_output_tokens
                .unwrap_or(defaults.estimated_output_tokens),
            complexity: self.complexity,
        };

        config.validate()?;
        Ok(config)
    }
}
