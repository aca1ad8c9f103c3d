//! LLM-backed analyst agents

use crate::agents::AgentKind;
use crate::config::AnalystConfig;
use crate::verdict::VerdictParser;
use agent_core::{
    AgentInvoker, AgentOutput, Asset, Error, ModelRef, Result, TaskComplexity, TokenUsage,
};
use agent_llm::{CompletionRequest, Message, ProviderRegistry, StopReason};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// An analyst that asks the routed model for a verdict
#[derive(Debug, Clone)]
pub struct LlmAnalyst {
    kind: AgentKind,
    registry: Arc<ProviderRegistry>,
    config: Arc<AnalystConfig>,
    parser: Arc<VerdictParser>,
}

impl LlmAnalyst {
    pub fn new(
        kind: AgentKind,
        registry: Arc<ProviderRegistry>,
        config: Arc<AnalystConfig>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            kind,
            registry,
            config,
            parser: Arc::new(VerdictParser::new()?),
        })
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// One analyst per kind, sharing registry, config and parser
    ///
    /// Kinds that do not support the asset class are rejected.
    pub fn set_for(
        asset: &Asset,
        kinds: &[AgentKind],
        registry: &Arc<ProviderRegistry>,
        config: &Arc<AnalystConfig>,
    ) -> Result<Vec<Arc<dyn AgentInvoker>>> {
        config.validate()?;
        let parser = Arc::new(VerdictParser::new()?);

        kinds
            .iter()
            .map(|&kind| {
                if !kind.supports(asset.class) {
                    return Err(Error::InvalidInput(format!(
                        "{kind} does not cover {:?} assets",
                        asset.class
                    )));
                }
                let analyst: Arc<dyn AgentInvoker> = Arc::new(Self {
                    kind,
                    registry: Arc::clone(registry),
                    config: Arc::clone(config),
                    parser: Arc::clone(&parser),
                });
                Ok(analyst)
            })
            .collect()
    }

    fn request(&self, asset: &Asset, model: &ModelRef) -> CompletionRequest {
        CompletionRequest::builder(&model.model)
            .system(self.kind.system_prompt())
            .add_message(Message::user(self.kind.user_prompt(&asset.symbol)))
            .max_tokens(self.config.max_tokens)
            .temperature(self.config.temperature)
            .build()
    }
}

#[async_trait]
impl AgentInvoker for LlmAnalyst {
    fn name(&self) -> &str {
        self.kind.name()
    }

    #[instrument(skip_all, fields(asset = %asset, model = %model))]
    async fn invoke(&self, asset: &Asset, model: &ModelRef) -> Result<AgentOutput> {
        let provider = self
            .registry
            .get(model.provider)
            .map_err(|e| e.into_core(model))?;

        let response = provider
            .complete(self.request(asset, model))
            .await
            .map_err(|e| e.into_core(model))?;

        if response.stop_reason == StopReason::MaxTokens {
            warn!(%model, "Analysis truncated at max_tokens");
        }

        let verdict = self.parser.parse(&response.text)?;
        debug!(
            recommendation = %verdict.recommendation,
            confidence = verdict.confidence,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Parsed verdict"
        );

        Ok(AgentOutput::new(
            verdict.recommendation,
            verdict.confidence,
            response.text,
            response.usage,
        ))
    }

    fn complexity(&self) -> TaskComplexity {
        self.config.complexity.unwrap_or(self.kind.complexity())
    }

    fn estimated_usage(&self) -> TokenUsage {
        self.config.estimated_usage()
    }
}
