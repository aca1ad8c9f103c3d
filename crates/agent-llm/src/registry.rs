//! Provider registry
//!
//! Maps each [`ProviderId`] to the backend that serves it. The registry is
//! the capability table the router's availability snapshot is derived from.

use crate::providers::{
    AnthropicConfig, AnthropicProvider, DEFAULT_REQUESTS_PER_MINUTE, DEFAULT_TIMEOUT_SECS,
    OpenAIConfig, OpenAIProvider,
};
use crate::{LLMError, LLMProvider, ProviderAvailability, Result};
use agent_core::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// `providers` section of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Client-side quota applied to every provider
    pub requests_per_minute: u32,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
    /// Base URL overrides per provider
    pub api_bases: BTreeMap<ProviderId, String>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_bases: BTreeMap::new(),
        }
    }
}

/// Registered LLM backends
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn LLMProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under the provider it reports
    pub fn register(&mut self, provider: Arc<dyn LLMProvider>) {
        debug!(provider = %provider.id(), "Registering LLM provider");
        self.providers.insert(provider.id(), provider);
    }

    pub fn with(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Register a backend for every provider whose credential is set
    pub fn from_env(config: &ProvidersConfig) -> Result<Self> {
        let mut registry = Self::new();
        let present = ProviderAvailability::from_env();

        for provider in present.providers() {
            let backend: Arc<dyn LLMProvider> = match provider {
                ProviderId::Anthropic => {
                    let mut settings = AnthropicConfig::from_env()?
                        .with_timeout(config.timeout_secs)
                        .with_requests_per_minute(config.requests_per_minute);
                    if let Some(base) = config.api_bases.get(&provider) {
                        settings = settings.with_api_base(base.clone());
                    }
                    Arc::new(AnthropicProvider::with_config(settings)?)
                }
                ProviderId::OpenAI | ProviderId::Groq | ProviderId::Google => {
                    let mut settings = OpenAIConfig::from_env(provider)?
                        .with_timeout(config.timeout_secs)
                        .with_requests_per_minute(config.requests_per_minute);
                    if let Some(base) = config.api_bases.get(&provider) {
                        settings = settings.with_api_base(base.clone());
                    }
                    Arc::new(OpenAIProvider::with_config(settings)?)
                }
            };
            registry.register(backend);
        }

        if registry.providers.is_empty() {
            warn!("No LLM provider credentials found in the environment");
        }
        Ok(registry)
    }

    /// Backend for `provider`
    pub fn get(&self, provider: ProviderId) -> Result<Arc<dyn LLMProvider>> {
        self.providers
            .get(&provider)
            .cloned()
            .ok_or(LLMError::ProviderNotConfigured(provider))
    }

    /// Providers with a registered backend
    pub fn availability(&self) -> ProviderAvailability {
        self.providers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.providers.keys().collect();
        ids.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &ids)
            .finish()
    }
}
