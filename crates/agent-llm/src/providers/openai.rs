//! OpenAI-compatible chat completions provider
//!
//! Serves OpenAI itself plus Groq and Google, which expose the same
//! `/chat/completions` API under their own base URLs.
//! See: https://platform.openai.com/docs/api-reference/chat
//!
//! ```no_run
//! use agent_core::ProviderId;
//! use agent_llm::{CompletionRequest, LLMProvider, Message};
//! use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OpenAIConfig::from_env(ProviderId::Groq)?.with_requests_per_minute(30);
//! let provider = OpenAIProvider::with_config(config)?;
//!
//! let request = CompletionRequest::builder("llama-3.1-8b-instant")
//!     .add_message(Message::user("Summarize AAPL's last quarter"))
//!     .max_tokens(200)
//!     .build();
//! let response = provider.complete(request).await?;
//! println!("{}", response.text);
//! # Ok(())
//! # }
//! ```

use super::{DEFAULT_REQUESTS_PER_MINUTE, DEFAULT_TIMEOUT_SECS, SharedRateLimiter};
use crate::{CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, Result, StopReason};
use agent_core::{ProviderId, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default API base for an OpenAI-compatible provider
pub fn default_api_base(provider: ProviderId) -> &'static str {
    match provider {
        ProviderId::Groq => "https://api.groq.com/openai/v1",
        ProviderId::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
        ProviderId::OpenAI | ProviderId::Anthropic => "https://api.openai.com/v1",
    }
}

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Provider this endpoint belongs to
    pub provider: ProviderId,

    /// API key for authentication
    pub api_key: String,

    /// Base URL of the chat completions API
    pub api_base: String,

    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,

    /// Client-side request quota
    pub requests_per_minute: u32,
}

impl OpenAIConfig {
    /// Config for `provider` with its default base URL
    pub fn new(provider: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            api_base: default_api_base(provider).to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }

    /// Read the key from the provider's credential variable
    pub fn from_env(provider: ProviderId) -> Result<Self> {
        let var = provider.credential_env_var();
        let api_key = std::env::var(var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                LLMError::ConfigurationError(format!("{var} environment variable not set"))
            })?;

        Ok(Self::new(provider, api_key))
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }
}

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
    rate_limiter: SharedRateLimiter,
}

impl OpenAIProvider {
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        if config.provider == ProviderId::Anthropic {
            return Err(LLMError::ConfigurationError(
                "Anthropic does not serve the chat completions API".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let rate_limiter = super::rate_limiter(config.requests_per_minute);

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Create a provider from the credential environment variable
    pub fn from_env(provider: ProviderId) -> Result<Self> {
        Self::with_config(OpenAIConfig::from_env(provider)?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(provider = %self.config.provider, model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.rate_limiter.until_ready().await;
        debug!("Sending request to {}", self.config.api_base);

        let model = request.model.clone();
        let body = build_request(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(super::status_error(status, error_text, &model));
        }

        let parsed: OpenAIResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        parse_response(parsed)
    }

    fn id(&self) -> ProviderId {
        self.config.provider
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: OpenAIUsage,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// System prompt goes first in the messages array
fn build_request(request: CompletionRequest) -> OpenAIRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system {
        messages.push(Message::system(system));
    }
    messages.extend(request.messages);

    OpenAIRequest {
        model: request.model,
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        stop: request.stop_sequences,
    }
}

fn parse_response(response: OpenAIResponse) -> Result<CompletionResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

    let text = choice
        .message
        .content
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| LLMError::UnexpectedResponse("Empty message content".to_string()))?;

    debug!(
        prompt_tokens = response.usage.prompt_tokens,
        completion_tokens = response.usage.completion_tokens,
        "Received response"
    );

    Ok(CompletionResponse {
        text,
        stop_reason: map_stop_reason(choice.finish_reason.as_deref().unwrap_or("stop")),
        usage: TokenUsage::new(response.usage.prompt_tokens, response.usage.completion_tokens),
    })
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "length" => StopReason::MaxTokens,
        "stop" => StopReason::EndTurn,
        other => {
            debug!("Unmapped stop reason: {other}");
            StopReason::EndTurn
        }
    }
}
