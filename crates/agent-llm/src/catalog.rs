//! Model catalog and routing rules
//!
//! The catalog is the static registry of every (provider, model) pair the
//! router may pick, with its pricing, context window and capability tier.
//! It is built once, validated, and shared read-only.

use agent_core::{CapabilityTier, Error, ModelRef, ProviderId, Result, TaskComplexity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One model offered by one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub provider: ProviderId,
    pub model: String,
    /// USD per 1K input tokens
    pub cost_per_1k_input: f64,
    /// USD per 1K output tokens
    pub cost_per_1k_output: f64,
    pub max_context_tokens: u32,
    pub tier: CapabilityTier,
}

impl ModelEntry {
    pub fn new(
        provider: ProviderId,
        model: impl Into<String>,
        cost_per_1k_input: f64,
        cost_per_1k_output: f64,
        max_context_tokens: u32,
        tier: CapabilityTier,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            cost_per_1k_input,
            cost_per_1k_output,
            max_context_tokens,
            tier,
        }
    }

    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(self.provider, self.model.clone())
    }

    pub fn matches(&self, model: &ModelRef) -> bool {
        self.provider == model.provider && self.model == model.model
    }

    /// Estimated USD cost of a call with the given token counts
    pub fn estimate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        f64::from(input_tokens) / 1000.0 * self.cost_per_1k_input
            + f64::from(output_tokens) / 1000.0 * self.cost_per_1k_output
    }

    /// Whether this model may serve a task of `complexity`
    pub fn is_eligible(&self, complexity: TaskComplexity) -> bool {
        self.tier.covers(complexity)
    }
}

/// Complexity level to models in priority order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingRule(BTreeMap<TaskComplexity, Vec<ModelRef>>);

impl RoutingRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, complexity: TaskComplexity, models: Vec<ModelRef>) -> Self {
        self.0.insert(complexity, models);
        self
    }

    /// Models listed for `complexity`, highest priority first
    pub fn priority(&self, complexity: TaskComplexity) -> &[ModelRef] {
        self.0.get(&complexity).map(Vec::as_slice).unwrap_or_default()
    }

    /// Position of `model` in the priority list for `complexity`
    pub fn rank(&self, complexity: TaskComplexity, model: &ModelRef) -> Option<usize> {
        self.priority(complexity).iter().position(|m| m == model)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TaskComplexity, &Vec<ModelRef>)> {
        self.0.iter()
    }
}

/// Catalog section of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Replaces the built-in entries when non-empty
    pub entries: Vec<ModelEntry>,
    /// Replaces the built-in rules when present
    pub rules: Option<RoutingRule>,
}

/// Immutable registry of routable models
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
    index: HashMap<ModelRef, usize>,
    rules: RoutingRule,
}

impl ModelCatalog {
    /// Build and validate a catalog
    ///
    /// Rejects duplicate entries, negative or non-finite prices, rule
    /// references to unknown models, and rule references whose tier is below
    /// the complexity they are listed under.
    pub fn new(entries: Vec<ModelEntry>, rules: RoutingRule) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.model.trim().is_empty() {
                return Err(Error::Config(format!("empty model name for {}", entry.provider)));
            }
            for cost in [entry.cost_per_1k_input, entry.cost_per_1k_output] {
                if !cost.is_finite() || cost < 0.0 {
                    return Err(Error::Config(format!(
                        "invalid price {cost} for {}",
                        entry.model_ref()
                    )));
                }
            }
            if index.insert(entry.model_ref(), i).is_some() {
                return Err(Error::Config(format!(
                    "duplicate catalog entry {}",
                    entry.model_ref()
                )));
            }
        }

        for (complexity, models) in rules.iter() {
            let mut seen = HashSet::new();
            for model in models {
                let entry = index
                    .get(model)
                    .map(|&i| &entries[i])
                    .ok_or_else(|| {
                        Error::Config(format!("{complexity} rule references unknown model {model}"))
                    })?;
                if !entry.is_eligible(*complexity) {
                    return Err(Error::Config(format!(
                        "{model} (tier {}) cannot serve {complexity} tasks",
                        entry.tier
                    )));
                }
                if !seen.insert(model) {
                    return Err(Error::Config(format!(
                        "{model} listed twice in {complexity} rule"
                    )));
                }
            }
        }

        Ok(Self {
            entries,
            index,
            rules,
        })
    }

    /// Catalog from the configuration section, falling back to built-ins
    pub fn from_config(config: CatalogConfig) -> Result<Self> {
        let entries = if config.entries.is_empty() {
            builtin_entries()
        } else {
            config.entries
        };
        let rules = config.rules.unwrap_or_else(builtin_rules);
        Self::new(entries, rules)
    }

    /// The built-in catalog of OpenAI, Anthropic, Groq and Google models
    pub fn builtin() -> Self {
        let entries = builtin_entries();
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.model_ref(), i))
            .collect();
        Self {
            entries,
            index,
            rules: builtin_rules(),
        }
    }

    /// Look up an entry; `UnknownModel` if absent
    pub fn get(&self, model: &ModelRef) -> Result<&ModelEntry> {
        self.index
            .get(model)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| Error::UnknownModel(model.clone()))
    }

    /// Entries in catalog order
    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn rules(&self) -> &RoutingRule {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Model ids grouped by provider, in catalog order
    pub fn models_by_provider(&self) -> BTreeMap<ProviderId, Vec<String>> {
        let mut grouped: BTreeMap<ProviderId, Vec<String>> = BTreeMap::new();
        for entry in &self.entries {
            grouped
                .entry(entry.provider)
                .or_default()
                .push(entry.model.clone());
        }
        grouped
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_entries() -> Vec<ModelEntry> {
    use ProviderId::{Anthropic, Google, Groq, OpenAI};
    use TaskComplexity::{Complex, Critical, Moderate, Simple};

    // Prices are published per 1M tokens; stored per 1K.
    vec![
        ModelEntry::new(OpenAI, "gpt-4o", 0.0025, 0.01, 128_000, Critical),
        ModelEntry::new(OpenAI, "gpt-4o-mini", 0.000_15, 0.0006, 128_000, Moderate),
        ModelEntry::new(OpenAI, "gpt-3.5-turbo", 0.0005, 0.0015, 16_385, Simple),
        ModelEntry::new(Anthropic, "claude-3-5-sonnet-20241022", 0.003, 0.015, 200_000, Critical),
        ModelEntry::new(Anthropic, "claude-3-5-haiku-20241022", 0.0008, 0.004, 200_000, Moderate),
        ModelEntry::new(Anthropic, "claude-3-opus-20240229", 0.015, 0.075, 200_000, Critical),
        ModelEntry::new(Groq, "llama-3.3-70b-versatile", 0.000_59, 0.000_79, 128_000, Moderate),
        ModelEntry::new(Groq, "llama-3.1-8b-instant", 0.000_05, 0.000_08, 128_000, Simple),
        ModelEntry::new(Google, "gemini-2.0-flash-exp", 0.0, 0.0, 1_048_576, Moderate),
        ModelEntry::new(Google, "gemini-1.5-pro", 0.001_25, 0.005, 2_097_152, Complex),
    ]
}

fn builtin_rules() -> RoutingRule {
    use ProviderId::{Anthropic, Google, Groq, OpenAI};

    let m = ModelRef::new;
    RoutingRule::new()
        .with(
            TaskComplexity::Simple,
            vec![
                m(Groq, "llama-3.1-8b-instant"),
                m(Google, "gemini-2.0-flash-exp"),
                m(OpenAI, "gpt-4o-mini"),
            ],
        )
        .with(
            TaskComplexity::Moderate,
            vec![
                m(OpenAI, "gpt-4o-mini"),
                m(Google, "gemini-2.0-flash-exp"),
                m(Anthropic, "claude-3-5-haiku-20241022"),
                m(Groq, "llama-3.3-70b-versatile"),
            ],
        )
        .with(
            TaskComplexity::Complex,
            vec![
                m(OpenAI, "gpt-4o"),
                m(Anthropic, "claude-3-5-sonnet-20241022"),
                m(Google, "gemini-1.5-pro"),
            ],
        )
        .with(
            TaskComplexity::Critical,
            vec![
                m(Anthropic, "claude-3-opus-20240229"),
                m(OpenAI, "gpt-4o"),
                m(Anthropic, "claude-3-5-sonnet-20241022"),
            ],
        )
}
