//! Model router
//!
//! Picks the (provider, model) that executes a task. A model is eligible when
//! its capability tier covers the task complexity. Eligible models are
//! ordered either by estimated cost (cost optimization, the default) or by
//! the routing rule's priority list, and the first one whose provider is
//! available wins.

use crate::budget::BudgetTracker;
use agent_core::{Error, ModelRef, ProviderId, Result, TaskComplexity, TaskType, TokenUsage};
use agent_llm::{ModelCatalog, ModelEntry, ProviderAvailability};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Usage that cost ordering and budget checks are computed at
pub const REFERENCE_USAGE: TokenUsage = TokenUsage {
    input_tokens: 1000,
    output_tokens: 500,
};

/// Router settings
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Order candidates by estimated cost instead of rule priority
    pub cost_optimization: bool,
    /// Usage assumed when estimating a candidate's cost
    pub reference_usage: TokenUsage,
    /// Preferred model, used whenever it is available and eligible
    pub default_model: Option<ModelRef>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cost_optimization: true,
            reference_usage: REFERENCE_USAGE,
            default_model: None,
        }
    }
}

impl RouterConfig {
    pub fn builder() -> RouterConfigBuilder {
        RouterConfigBuilder::default()
    }
}

/// Builder for [`RouterConfig`]
#[derive(Debug, Default)]
pub struct RouterConfigBuilder {
    config: RouterConfig,
}

impl RouterConfigBuilder {
    pub fn cost_optimization(mut self, enabled: bool) -> Self {
        self.config.cost_optimization = enabled;
        self
    }

    pub fn reference_usage(mut self, usage: TokenUsage) -> Self {
        self.config.reference_usage = usage;
        self
    }

    pub fn default_model(mut self, model: ModelRef) -> Self {
        self.config.default_model = Some(model);
        self
    }

    pub fn build(self) -> RouterConfig {
        self.config
    }
}

/// Constraints for one routing decision
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteRequest {
    pub complexity: TaskComplexity,
    /// Providers that must not be picked, e.g. after they failed
    pub excluded: BTreeSet<ProviderId>,
    /// Per-call cost ceiling in USD
    pub max_cost: Option<f64>,
    /// Minimum context window in tokens
    pub min_context: Option<u32>,
    /// Usage the cost ceiling is checked against; router reference if unset
    pub usage: Option<TokenUsage>,
}

impl RouteRequest {
    pub fn new(complexity: TaskComplexity) -> Self {
        Self {
            complexity,
            ..Self::default()
        }
    }

    pub fn excluding(mut self, provider: ProviderId) -> Self {
        self.excluded.insert(provider);
        self
    }

    pub fn with_max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }

    pub fn with_min_context(mut self, tokens: u32) -> Self {
        self.min_context = Some(tokens);
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Chooses models for tasks from the catalog
#[derive(Debug, Clone)]
pub struct Router {
    catalog: Arc<ModelCatalog>,
    config: RouterConfig,
    budget: Option<Arc<BudgetTracker>>,
}

impl Router {
    /// Create a router; the default model, if any, must be in the catalog
    pub fn new(catalog: Arc<ModelCatalog>, config: RouterConfig) -> Result<Self> {
        if let Some(model) = &config.default_model {
            catalog.get(model)?;
        }
        Ok(Self {
            catalog,
            config,
            budget: None,
        })
    }

    /// Router over the built-in catalog with default settings
    pub fn builtin() -> Self {
        Self {
            catalog: Arc::new(ModelCatalog::builtin()),
            config: RouterConfig::default(),
            budget: None,
        }
    }

    /// Cap recommendations by the tracker's remaining session budget
    pub fn with_budget(mut self, budget: Arc<BudgetTracker>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn catalog(&self) -> &Arc<ModelCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Eligible entries for `complexity`, in routing order
    pub fn candidates(&self, complexity: TaskComplexity) -> Vec<&ModelEntry> {
        let rules = self.catalog.rules();
        let usage = self.config.reference_usage;

        let mut eligible: Vec<(usize, usize, f64, &ModelEntry)> = self
            .catalog
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_eligible(complexity))
            .map(|(position, entry)| {
                let rank = rules
                    .rank(complexity, &entry.model_ref())
                    .unwrap_or(usize::MAX);
                let cost = entry.estimate_cost(usage.input_tokens, usage.output_tokens);
                (rank, position, cost, entry)
            })
            .collect();

        if self.config.cost_optimization {
            eligible.sort_by(|a, b| {
                a.2.total_cmp(&b.2)
                    .then(a.0.cmp(&b.0))
                    .then(a.1.cmp(&b.1))
            });
        } else {
            eligible.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        }

        eligible.into_iter().map(|(_, _, _, entry)| entry).collect()
    }

    /// Route a task described in free text
    pub fn route_task(
        &self,
        description: &str,
        complexity: TaskComplexity,
        availability: &ProviderAvailability,
    ) -> Result<ModelRef> {
        debug!(task = description, %complexity, "Routing task");
        self.route(&RouteRequest::new(complexity), availability)
    }

    /// Pick a model satisfying `request`
    pub fn route(
        &self,
        request: &RouteRequest,
        availability: &ProviderAvailability,
    ) -> Result<ModelRef> {
        self.route_entry(request, availability).map(ModelEntry::model_ref)
    }

    /// Like [`Self::route`], returning the catalog entry
    pub fn route_entry(
        &self,
        request: &RouteRequest,
        availability: &ProviderAvailability,
    ) -> Result<&ModelEntry> {
        let usage = request.usage.unwrap_or(self.config.reference_usage);
        let reachable = |entry: &ModelEntry| {
            availability.is_available(entry.provider)
                && !request.excluded.contains(&entry.provider)
                && request
                    .min_context
                    .is_none_or(|min| entry.max_context_tokens >= min)
        };
        let affordable = |entry: &ModelEntry| {
            request.max_cost.is_none_or(|max| {
                entry.estimate_cost(usage.input_tokens, usage.output_tokens) <= max
            })
        };

        if let Some(default) = &self.config.default_model {
            let entry = self.catalog.get(default)?;
            if entry.is_eligible(request.complexity) && reachable(entry) && affordable(entry) {
                debug!(model = %default, "Routing to configured default model");
                return Ok(entry);
            }
        }

        let candidates = self.candidates(request.complexity);
        let mut cheapest_reachable: Option<f64> = None;

        for entry in candidates {
            if !reachable(entry) {
                continue;
            }
            if affordable(entry) {
                debug!(
                    model = %entry.model_ref(),
                    complexity = %request.complexity,
                    "Routed"
                );
                return Ok(entry);
            }
            let cost = entry.estimate_cost(usage.input_tokens, usage.output_tokens);
            cheapest_reachable = Some(cheapest_reachable.map_or(cost, |c: f64| c.min(cost)));
        }

        match (cheapest_reachable, request.max_cost) {
            (Some(cheapest), Some(budget)) => Err(Error::BudgetExceeded { budget, cheapest }),
            _ => Err(Error::NoProviderAvailable {
                complexity: request.complexity,
            }),
        }
    }

    /// Best model for a task type within `budget`
    ///
    /// With a budget tracker attached, the effective budget is the smaller of
    /// `budget` and the remaining session budget.
    pub fn recommend_model(
        &self,
        task_type: TaskType,
        budget: Option<f64>,
        availability: &ProviderAvailability,
    ) -> Result<ModelRef> {
        let remaining = self.budget.as_ref().and_then(|tracker| tracker.remaining());
        let effective = match (budget, remaining) {
            (Some(budget), Some(remaining)) => Some(budget.min(remaining)),
            (budget, remaining) => budget.or(remaining),
        };

        let mut request = RouteRequest::new(task_type.complexity());
        request.max_cost = effective;

        debug!(%task_type, budget = ?effective, "Recommending model");
        self.route(&request, availability)
    }

    /// Pure cost estimate for a catalog model
    pub fn estimate_cost(
        &self,
        provider: ProviderId,
        model: &str,
        input_tokens: u32,
        output_tokens: u32,
    ) -> Result<f64> {
        let entry = self.catalog.get(&ModelRef::new(provider, model))?;
        Ok(entry.estimate_cost(input_tokens, output_tokens))
    }

    /// Model ids per available provider
    pub fn available_models(
        &self,
        availability: &ProviderAvailability,
    ) -> BTreeMap<ProviderId, Vec<String>> {
        self.catalog
            .models_by_provider()
            .into_iter()
            .filter(|(provider, _)| availability.is_available(*provider))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::ProviderId::{Anthropic, Google, Groq, OpenAI};

    fn no_cost_router() -> Router {
        Router::new(
            Arc::new(ModelCatalog::builtin()),
            RouterConfig::builder().cost_optimization(false).build(),
        )
        .unwrap()
    }

    fn refs(entries: &[&ModelEntry]) -> Vec<String> {
        entries.iter().map(|e| e.model.clone()).collect()
    }

    #[test]
    fn test_route_only_returns_eligible_tiers() {
        let catalog = ModelCatalog::builtin();
        for router in [Router::builtin(), no_cost_router()] {
            for complexity in TaskComplexity::ALL {
                for candidate in router.candidates(complexity) {
                    assert!(candidate.tier >= complexity);
                }

                let mut availability = ProviderAvailability::all_available();
                // Walk the whole list by knocking out each winner's provider
                while let Ok(model) = router.route_task("drain", complexity, &availability) {
                    let entry = catalog.get(&model).unwrap();
                    assert!(entry.tier >= complexity, "{model} routed for {complexity}");
                    availability.set(model.provider, false);
                }
            }
        }
    }

    #[test]
    fn test_cost_optimized_order() {
        let router = Router::builtin();
        assert_eq!(
            refs(&router.candidates(TaskComplexity::Critical)),
            vec!["gpt-4o", "claude-3-5-sonnet-20241022", "claude-3-opus-20240229"]
        );
        assert_eq!(
            refs(&router.candidates(TaskComplexity::Complex))[0],
            "gemini-1.5-pro"
        );
        assert_eq!(
            refs(&router.candidates(TaskComplexity::Moderate))[..3],
            ["gemini-2.0-flash-exp", "gpt-4o-mini", "llama-3.3-70b-versatile"]
        );
    }

    #[test]
    fn test_rule_priority_order() {
        let router = no_cost_router();
        assert_eq!(
            refs(&router.candidates(TaskComplexity::Critical)),
            vec!["claude-3-opus-20240229", "gpt-4o", "claude-3-5-sonnet-20241022"]
        );
        // Unlisted eligible models trail the rule entries
        assert_eq!(
            refs(&router.candidates(TaskComplexity::Complex)),
            vec![
                "gpt-4o",
                "claude-3-5-sonnet-20241022",
                "gemini-1.5-pro",
                "claude-3-opus-20240229"
            ]
        );
    }

    #[test]
    fn test_fallback_to_next_available() {
        let router = no_cost_router();
        let all = ProviderAvailability::all_available();

        let top = router
            .route_task("deep dive", TaskComplexity::Critical, &all)
            .unwrap();
        assert_eq!(top, ModelRef::new(Anthropic, "claude-3-opus-20240229"));

        let no_anthropic = all.clone().with(Anthropic, false);
        let next = router
            .route_task("deep dive", TaskComplexity::Critical, &no_anthropic)
            .unwrap();
        assert_eq!(next, ModelRef::new(OpenAI, "gpt-4o"));

        let exhausted = no_anthropic.with(OpenAI, false);
        assert_eq!(
            router.route_task("deep dive", TaskComplexity::Critical, &exhausted),
            Err(Error::NoProviderAvailable {
                complexity: TaskComplexity::Critical
            })
        );
    }

    #[test]
    fn test_cost_optimized_fallback() {
        let router = Router::builtin();
        let availability = ProviderAvailability::all_available().with(Google, false);
        assert_eq!(
            router
                .route_task("screen", TaskComplexity::Moderate, &availability)
                .unwrap(),
            ModelRef::new(OpenAI, "gpt-4o-mini")
        );

        let only_anthropic: ProviderAvailability = [Anthropic].into_iter().collect();
        assert_eq!(
            router
                .route_task("screen", TaskComplexity::Moderate, &only_anthropic)
                .unwrap(),
            ModelRef::new(Anthropic, "claude-3-5-haiku-20241022")
        );
    }

    #[test]
    fn test_exclusion_and_context() {
        let router = Router::builtin();
        let all = ProviderAvailability::all_available();

        let request = RouteRequest::new(TaskComplexity::Simple)
            .excluding(Google)
            .excluding(Groq);
        assert_eq!(
            router.route(&request, &all).unwrap(),
            ModelRef::new(OpenAI, "gpt-4o-mini")
        );

        let request = RouteRequest::new(TaskComplexity::Simple).with_min_context(1_500_000);
        assert_eq!(
            router.route(&request, &all).unwrap(),
            ModelRef::new(Google, "gemini-1.5-pro")
        );
    }

    #[test]
    fn test_default_model_override() {
        let config = RouterConfig::builder()
            .default_model(ModelRef::new(Anthropic, "claude-3-5-haiku-20241022"))
            .build();
        let router = Router::new(Arc::new(ModelCatalog::builtin()), config).unwrap();
        let all = ProviderAvailability::all_available();

        assert_eq!(
            router
                .route_task("x", TaskComplexity::Moderate, &all)
                .unwrap()
                .provider,
            Anthropic
        );
        // Not eligible for critical work, so normal routing applies
        assert_eq!(
            router
                .route_task("x", TaskComplexity::Critical, &all)
                .unwrap(),
            ModelRef::new(OpenAI, "gpt-4o")
        );
    }

    #[test]
    fn test_unknown_default_model_rejected() {
        let config = RouterConfig::builder()
            .default_model(ModelRef::new(OpenAI, "gpt-7"))
            .build();
        assert!(matches!(
            Router::new(Arc::new(ModelCatalog::builtin()), config),
            Err(Error::UnknownModel(_))
        ));
    }

    #[test]
    fn test_estimate_cost_properties() {
        let router = Router::builtin();
        for entry in router.catalog().entries() {
            for n in [0_u32, 1, 250, 1000, 123_457] {
                let single = router
                    .estimate_cost(entry.provider, &entry.model, n, n)
                    .unwrap();
                let double = router
                    .estimate_cost(entry.provider, &entry.model, 2 * n, 2 * n)
                    .unwrap();
                assert_eq!(double, 2.0 * single);
                assert_eq!(
                    single,
                    router.estimate_cost(entry.provider, &entry.model, n, n).unwrap()
                );
                let more = router
                    .estimate_cost(entry.provider, &entry.model, n + 1, n)
                    .unwrap();
                assert!(more >= single);
            }
        }

        assert!(matches!(
            router.estimate_cost(OpenAI, "gpt-2", 1, 1),
            Err(Error::UnknownModel(_))
        ));
    }

    #[test]
    fn test_recommend_model() {
        let router = Router::builtin();
        let all = ProviderAvailability::all_available();

        // deep_analysis is critical; cheapest critical model is gpt-4o at $0.0075
        assert_eq!(
            router
                .recommend_model(TaskType::DeepAnalysis, Some(0.01), &all)
                .unwrap(),
            ModelRef::new(OpenAI, "gpt-4o")
        );

        let err = router
            .recommend_model(TaskType::DeepAnalysis, Some(0.001), &all)
            .unwrap_err();
        assert!(matches!(err, Error::BudgetExceeded { cheapest, .. } if (cheapest - 0.0075).abs() < 1e-12));

        assert!(matches!(
            router.recommend_model(TaskType::Analysis, Some(1.0), &ProviderAvailability::none()),
            Err(Error::NoProviderAvailable { .. })
        ));
    }

    #[test]
    fn test_recommend_respects_remaining_session_budget() {
        let tracker = Arc::new(BudgetTracker::with_cap(0.005));
        let router = Router::builtin().with_budget(Arc::clone(&tracker));
        let all = ProviderAvailability::all_available().with(Google, false);

        // Complex: cheapest without Google is gpt-4o at $0.0075 > $0.005 remaining
        assert!(matches!(
            router.recommend_model(TaskType::Analysis, Some(1.0), &all),
            Err(Error::BudgetExceeded { .. })
        ));

        // Simple work still fits
        assert_eq!(
            router
                .recommend_model(TaskType::QuickLookup, None, &all)
                .unwrap(),
            ModelRef::new(Groq, "llama-3.1-8b-instant")
        );
    }

    #[test]
    fn test_available_models() {
        let router = Router::builtin();
        let availability: ProviderAvailability = [OpenAI, Groq].into_iter().collect();
        let models = router.available_models(&availability);
        assert_eq!(models.len(), 2);
        assert_eq!(models[&OpenAI].len(), 3);
        assert!(!models.contains_key(&Anthropic));
    }
}
