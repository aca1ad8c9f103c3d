//! Task coordinator
//!
//! Fans a set of agents out over one or more assets, bounded by a shared
//! worker pool, and reduces each asset's results into a consensus report.

use crate::config::{CoordinatorConfig, ExecutionOptions};
use crate::consensus;
use crate::invocation::{Invocation, InvocationContext};
use crate::report::{AssetReports, ComparisonReport, ConsensusReport};
use agent_core::{AgentInvoker, AgentResult, Asset, Error, Result};
use agent_llm::ProviderAvailability;
use agent_runtime::{BudgetTracker, Router};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, instrument, warn};
use uuid::Uuid;

/// Shared handle to an analysis agent
pub type SharedAgent = Arc<dyn AgentInvoker>;

struct Pending {
    agent: String,
    result: oneshot::Receiver<AgentResult>,
    handle: JoinHandle<()>,
}

/// Coordinates agent invocations against the router and session budget
#[derive(Debug, Clone)]
pub struct TaskCoordinator {
    router: Arc<Router>,
    budget: Arc<BudgetTracker>,
    config: Arc<CoordinatorConfig>,
    availability: Arc<RwLock<ProviderAvailability>>,
}

impl TaskCoordinator {
    pub fn builder() -> TaskCoordinatorBuilder {
        TaskCoordinatorBuilder::default()
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn budget(&self) -> &Arc<BudgetTracker> {
        &self.budget
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Current availability snapshot
    pub fn availability(&self) -> ProviderAvailability {
        self.availability
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the availability snapshot used by subsequent requests
    pub fn set_availability(&self, availability: ProviderAvailability) {
        *self
            .availability
            .write()
            .unwrap_or_else(PoisonError::into_inner) = availability;
    }

    fn context(&self) -> Arc<InvocationContext> {
        Arc::new(InvocationContext {
            router: Arc::clone(&self.router),
            budget: Arc::clone(&self.budget),
            availability: self.availability(),
            retry: self.config.retry.clone(),
            call_timeout: self.config.call_timeout,
            provider_fallback: self.config.provider_fallback,
        })
    }

    /// Run every agent against one asset and reduce the results
    ///
    /// # Arguments
    ///
    /// * `asset` - The asset to analyse
    /// * `agents` - The agent set; every agent yields exactly one result
    /// * `options` - Parallel with a pool of `max_workers`, or sequential in
    ///   the given order
    ///
    /// # Returns
    ///
    /// The consensus report, or `InsufficientData` when no agent produced a
    /// verdict.
    pub async fn analyze_comprehensive(
        &self,
        asset: &Asset,
        agents: &[SharedAgent],
        options: ExecutionOptions,
    ) -> Result<ConsensusReport> {
        let permits = Arc::new(Semaphore::new(options.pool_size()));
        self.analyze_with_permits(asset, agents, options, permits, self.context())
            .await
    }

    /// Analyse several assets under one shared worker pool and rank them
    #[instrument(skip_all, fields(assets = assets.len(), agents = agents.len()))]
    pub async fn compare_assets(
        &self,
        assets: &[Asset],
        agents: &[SharedAgent],
        options: ExecutionOptions,
    ) -> Result<ComparisonReport> {
        let reports = self.analyze_assets(assets, agents, options).await?;
        let comparison = ComparisonReport::new(reports);
        if let Some(best) = comparison.best() {
            info!(symbol = %best.symbol, score = best.score, "Comparison complete");
        }
        Ok(comparison)
    }

    /// Analyse several assets under one shared worker pool
    #[instrument(skip_all, fields(assets = assets.len(), agents = agents.len()))]
    pub async fn batch_analyze(
        &self,
        assets: &[Asset],
        agents: &[SharedAgent],
        options: ExecutionOptions,
    ) -> Result<AssetReports> {
        self.analyze_assets(assets, agents, options).await
    }

    async fn analyze_assets(
        &self,
        assets: &[Asset],
        agents: &[SharedAgent],
        options: ExecutionOptions,
    ) -> Result<AssetReports> {
        if assets.is_empty() {
            return Err(Error::InvalidInput("no assets given".to_string()));
        }

        let mut seen = BTreeSet::new();
        let unique: Vec<&Asset> = assets
            .iter()
            .filter(|asset| seen.insert(asset.symbol.clone()))
            .collect();
        if unique.len() < assets.len() {
            debug!(
                given = assets.len(),
                unique = unique.len(),
                "Ignoring duplicate symbols"
            );
        }

        let permits = Arc::new(Semaphore::new(options.pool_size()));
        let ctx = self.context();
        let mut reports = AssetReports::new();

        if options.parallel {
            let runs = unique.iter().map(|asset| {
                self.analyze_with_permits(
                    asset,
                    agents,
                    options,
                    Arc::clone(&permits),
                    Arc::clone(&ctx),
                )
            });
            let outcomes = join_all(runs).await;
            for (asset, outcome) in unique.iter().zip(outcomes) {
                reports.insert(asset.symbol.clone(), outcome);
            }
        } else {
            for asset in unique {
                let outcome = self
                    .analyze_with_permits(
                        asset,
                        agents,
                        options,
                        Arc::clone(&permits),
                        Arc::clone(&ctx),
                    )
                    .await;
                reports.insert(asset.symbol.clone(), outcome);
            }
        }

        for (symbol, outcome) in &reports {
            if let Err(e) = outcome {
                warn!(%symbol, error = %e, "Asset analysis produced no consensus");
            }
        }
        Ok(reports)
    }

    async fn analyze_with_permits(
        &self,
        asset: &Asset,
        agents: &[SharedAgent],
        options: ExecutionOptions,
        permits: Arc<Semaphore>,
        ctx: Arc<InvocationContext>,
    ) -> Result<ConsensusReport> {
        let request_id = Uuid::new_v4();
        let span = info_span!("analysis", %request_id, asset = %asset);

        async move {
            info!(
                agents = agents.len(),
                parallel = options.parallel,
                workers = options.pool_size(),
                "Starting analysis"
            );

            let mut results = Vec::with_capacity(agents.len());
            if options.parallel {
                let pending: Vec<Pending> = agents
                    .iter()
                    .map(|agent| spawn_invocation(agent, asset, &permits, &ctx))
                    .collect();
                for task in pending {
                    results.push(collect(task).await);
                }
            } else {
                for agent in agents {
                    let task = spawn_invocation(agent, asset, &permits, &ctx);
                    results.push(collect(task).await);
                }
            }

            results.sort_by(|a, b| a.agent.cmp(&b.agent));
            let consensus = consensus::reduce(&asset.symbol, &results)?;
            let report = ConsensusReport::new(request_id, asset.clone(), consensus, results);

            info!(
                recommendation = %report.recommendation,
                confidence = report.confidence,
                agreement = report.agreement,
                cost = report.total_cost,
                "Analysis complete"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

fn spawn_invocation(
    agent: &SharedAgent,
    asset: &Asset,
    permits: &Arc<Semaphore>,
    ctx: &Arc<InvocationContext>,
) -> Pending {
    let (tx, rx) = oneshot::channel();
    let mut invocation = Invocation::new(Arc::clone(agent), asset.clone());
    let permits = Arc::clone(permits);
    let ctx = Arc::clone(ctx);
    let span = info_span!("agent", name = agent.name());

    let handle = tokio::spawn(
        async move {
            // The semaphore is never closed
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let result = invocation.run(&ctx).await;
            let _ = tx.send(result);
        }
        .instrument(span),
    );

    Pending {
        agent: agent.name().to_string(),
        result: rx,
        handle,
    }
}

async fn collect(task: Pending) -> AgentResult {
    match task.result.await {
        Ok(result) => result,
        Err(_) => {
            let reason = match task.handle.await {
                Err(e) if e.is_panic() => "agent task panicked",
                Err(_) => "agent task was cancelled",
                Ok(()) => "agent task ended without a result",
            };
            warn!(agent = %task.agent, reason, "Agent task lost");
            AgentResult::failed(task.agent, reason, None, 0.0, 0)
        }
    }
}

/// Builder for [`TaskCoordinator`]
#[derive(Debug, Default)]
pub struct TaskCoordinatorBuilder {
    router: Option<Arc<Router>>,
    budget: Option<Arc<BudgetTracker>>,
    config: CoordinatorConfig,
    availability: Option<ProviderAvailability>,
}

impl TaskCoordinatorBuilder {
    pub fn router(mut self, router: Arc<Router>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn budget(mut self, budget: Arc<BudgetTracker>) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn availability(mut self, availability: ProviderAvailability) -> Self {
        self.availability = Some(availability);
        self
    }

    /// Build the coordinator
    ///
    /// Defaults: built-in router, unlimited budget, and availability read
    /// from the provider credential environment variables.
    pub fn build(self) -> Result<TaskCoordinator> {
        self.config.validate()?;
        Ok(TaskCoordinator {
            router: self.router.unwrap_or_else(|| Arc::new(Router::builtin())),
            budget: self
                .budget
                .unwrap_or_else(|| Arc::new(BudgetTracker::unlimited())),
            config: Arc::new(self.config),
            availability: Arc::new(RwLock::new(
                self.availability
                    .unwrap_or_else(ProviderAvailability::from_env),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{
        AgentOutput, AgentStatus, ModelRef, ProviderId, Recommendation, TaskComplexity, TokenUsage,
    };
    use agent_runtime::RetryPolicy;
    use async_trait::async_trait;
    use mockall::mock;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    mock! {
        pub Agent {}

        #[async_trait]
        impl AgentInvoker for Agent {
            fn name(&self) -> &str;
            async fn invoke(&self, asset: &Asset, model: &ModelRef) -> agent_core::Result<AgentOutput>;
            fn complexity(&self) -> TaskComplexity;
            fn estimated_usage(&self) -> TokenUsage;
        }
    }

    fn mock_agent(name: &str, rec: Recommendation, confidence: f64) -> SharedAgent {
        let mut agent = MockAgent::new();
        agent.expect_name().return_const(name.to_string());
        agent
            .expect_complexity()
            .return_const(TaskComplexity::Moderate);
        agent
            .expect_estimated_usage()
            .return_const(TokenUsage::new(1000, 500));
        agent.expect_invoke().times(1).returning(move |asset, _| {
            Ok(AgentOutput::new(
                rec,
                confidence,
                format!("{asset} looks {rec}."),
                TokenUsage::new(1000, 500),
            ))
        });
        Arc::new(agent)
    }

    /// Records the order and overlap of calls
    struct Tracked {
        name: String,
        delay: Duration,
        outcome: Option<Recommendation>,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        order: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl AgentInvoker for Tracked {
        fn name(&self) -> &str {
            &self.name
        }

        async fn invoke(&self, asset: &Asset, _model: &ModelRef) -> agent_core::Result<AgentOutput> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.order
                .lock()
                .unwrap()
                .push(format!("{}:{}", asset.symbol, self.name));
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.outcome {
                Some(rec) => Ok(AgentOutput::new(rec, 6.0, "tracked", TokenUsage::new(10, 10))),
                None => Err(Error::MalformedResponse("no verdict".into())),
            }
        }
    }

    struct TrackedAgents {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        order: Arc<Mutex<Vec<String>>>,
    }

    impl TrackedAgents {
        fn new() -> Self {
            Self {
                in_flight: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
                order: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn agent(&self, name: &str, delay_ms: u64, outcome: Option<Recommendation>) -> SharedAgent {
            Arc::new(Tracked {
                name: name.to_string(),
                delay: Duration::from_millis(delay_ms),
                outcome,
                in_flight: Arc::clone(&self.in_flight),
                peak: Arc::clone(&self.peak),
                order: Arc::clone(&self.order),
            })
        }
    }

    struct Panicking;

    #[async_trait]
    impl AgentInvoker for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn invoke(&self, _asset: &Asset, _model: &ModelRef) -> agent_core::Result<AgentOutput> {
            panic!("boom");
        }
    }

    fn coordinator(budget: BudgetTracker) -> TaskCoordinator {
        TaskCoordinator::builder()
            .budget(Arc::new(budget))
            .availability(ProviderAvailability::none().with(ProviderId::OpenAI, true))
            .config(
                CoordinatorConfig::builder()
                    .retry(RetryPolicy::fast())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn aapl() -> Asset {
        Asset::stock("AAPL").unwrap()
    }

    #[tokio::test]
    async fn test_analyze_comprehensive_consensus() {
        let coordinator = coordinator(BudgetTracker::unlimited());
        let agents = vec![
            mock_agent("technical", Recommendation::Buy, 9.0),
            mock_agent("fundamental", Recommendation::Buy, 8.0),
            mock_agent("stock_analyst", Recommendation::Hold, 6.0),
            mock_agent("sentiment", Recommendation::Buy, 7.0),
        ];

        let report = coordinator
            .analyze_comprehensive(&aapl(), &agents, ExecutionOptions::parallel(4))
            .await
            .unwrap();

        assert_eq!(report.recommendation, Recommendation::Buy);
        assert!((report.agreement - 0.75).abs() < 1e-12);
        assert!((report.confidence - 7.5).abs() < 1e-12);
        let names: Vec<&str> = report.results.iter().map(|r| r.agent.as_str()).collect();
        assert_eq!(names, vec!["fundamental", "sentiment", "stock_analyst", "technical"]);
        // gpt-4o-mini at the reference usage, four times
        assert!((report.total_cost - 4.0 * 0.000_45).abs() < 1e-12);
        assert!(
            report
                .results
                .iter()
                .all(|r| r.model == Some(ModelRef::new(ProviderId::OpenAI, "gpt-4o-mini")))
        );
    }

    #[tokio::test]
    async fn test_worker_pool_bounds_concurrency() {
        let coordinator = coordinator(BudgetTracker::unlimited());
        let tracked = TrackedAgents::new();
        let agents: Vec<SharedAgent> = (0..6)
            .map(|i| tracked.agent(&format!("agent{i}"), 20, Some(Recommendation::Hold)))
            .collect();

        let report = coordinator
            .analyze_comprehensive(&aapl(), &agents, ExecutionOptions::parallel(2))
            .await
            .unwrap();

        assert_eq!(report.count(AgentStatus::Ok), 6);
        assert!(tracked.peak.load(Ordering::SeqCst) <= 2);
        assert!(tracked.peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_sequential_preserves_order() {
        let coordinator = coordinator(BudgetTracker::unlimited());
        let tracked = TrackedAgents::new();
        let agents = vec![
            tracked.agent("zeta", 5, Some(Recommendation::Buy)),
            tracked.agent("alpha", 1, Some(Recommendation::Buy)),
            tracked.agent("mid", 3, Some(Recommendation::Sell)),
        ];

        let report = coordinator
            .analyze_comprehensive(&aapl(), &agents, ExecutionOptions::sequential())
            .await
            .unwrap();

        assert_eq!(
            *tracked.order.lock().unwrap(),
            vec!["AAPL:zeta", "AAPL:alpha", "AAPL:mid"]
        );
        assert_eq!(tracked.peak.load(Ordering::SeqCst), 1);
        assert_eq!(report.recommendation, Recommendation::Buy);
    }

    #[tokio::test]
    async fn test_panicking_agent_does_not_block_others() {
        let coordinator = coordinator(BudgetTracker::unlimited());
        let agents: Vec<SharedAgent> = vec![
            Arc::new(Panicking),
            mock_agent("fundamental", Recommendation::Sell, 4.0),
        ];

        let report = coordinator
            .analyze_comprehensive(&aapl(), &agents, ExecutionOptions::parallel(2))
            .await
            .unwrap();

        assert_eq!(report.recommendation, Recommendation::Sell);
        let panicked = &report.results[1];
        assert_eq!(panicked.agent, "panicking");
        assert_eq!(panicked.status, AgentStatus::Failed);
        assert_eq!(panicked.error.as_deref(), Some("agent panicked: boom"));
    }

    #[tokio::test]
    async fn test_budget_cap_skips_remaining_agents() {
        // Room for two gpt-4o-mini reservations at the reference usage
        let coordinator = coordinator(BudgetTracker::with_cap(0.001));
        let agents = vec![
            mock_agent("a", Recommendation::Buy, 8.0),
            mock_agent("b", Recommendation::Buy, 8.0),
        ];
        let mut skipped = MockAgent::new();
        skipped.expect_name().return_const("c".to_string());
        skipped
            .expect_complexity()
            .return_const(TaskComplexity::Moderate);
        skipped
            .expect_estimated_usage()
            .return_const(TokenUsage::new(1000, 500));
        skipped.expect_invoke().never();
        let mut agents = agents;
        agents.push(Arc::new(skipped));

        let report = coordinator
            .analyze_comprehensive(&aapl(), &agents, ExecutionOptions::sequential())
            .await
            .unwrap();

        assert_eq!(report.count(AgentStatus::Ok), 2);
        assert_eq!(report.results[2].status, AgentStatus::Skipped);
        assert!(coordinator.budget().spent() <= 0.001);
    }

    /// Fails every call with a transient provider error
    struct AlwaysDown {
        name: String,
        calls: Mutex<Vec<ProviderId>>,
    }

    #[async_trait]
    impl AgentInvoker for AlwaysDown {
        fn name(&self) -> &str {
            &self.name
        }

        async fn invoke(&self, _asset: &Asset, model: &ModelRef) -> agent_core::Result<AgentOutput> {
            self.calls.lock().unwrap().push(model.provider);
            Err(Error::Provider {
                provider: model.provider,
                message: "HTTP 503".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_no_verdicts_is_insufficient_data() {
        let coordinator = coordinator(BudgetTracker::unlimited());
        coordinator.set_availability(
            ProviderAvailability::none()
                .with(ProviderId::OpenAI, true)
                .with(ProviderId::Groq, true),
        );
        let down: Vec<Arc<AlwaysDown>> = ["fundamental", "technical", "stock_analyst", "sentiment"]
            .iter()
            .map(|name| {
                Arc::new(AlwaysDown {
                    name: (*name).to_string(),
                    calls: Mutex::new(Vec::new()),
                })
            })
            .collect();
        let agents: Vec<SharedAgent> = down
            .iter()
            .map(|agent| Arc::clone(agent) as SharedAgent)
            .collect();

        let err = coordinator
            .analyze_comprehensive(&aapl(), &agents, ExecutionOptions::parallel(4))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            Error::InsufficientData {
                asset: "AAPL".into(),
                attempted: 4
            }
        );
        // Three tries on OpenAI, then three on Groq, for every agent
        for agent in &down {
            let calls = agent.calls.lock().unwrap();
            assert_eq!(calls.len(), 6, "{}", agent.name);
            assert!(calls[..3].iter().all(|p| *p == ProviderId::OpenAI));
            assert!(calls[3..].iter().all(|p| *p == ProviderId::Groq));
        }
        assert_eq!(coordinator.budget().spent(), 0.0);
    }

    #[tokio::test]
    async fn test_no_provider_available_fails_every_agent() {
        let coordinator = coordinator(BudgetTracker::unlimited());
        coordinator.set_availability(ProviderAvailability::none());
        let tracked = TrackedAgents::new();
        let agents = vec![tracked.agent("a", 1, Some(Recommendation::Buy))];

        let result = coordinator
            .analyze_comprehensive(&aapl(), &agents, ExecutionOptions::default())
            .await;

        assert!(matches!(result, Err(Error::InsufficientData { .. })));
        assert!(tracked.order.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compare_shares_the_worker_pool() {
        let coordinator = coordinator(BudgetTracker::unlimited());
        let tracked = TrackedAgents::new();
        let agents = vec![
            tracked.agent("a", 15, Some(Recommendation::Buy)),
            tracked.agent("b", 15, Some(Recommendation::Buy)),
        ];
        let assets = vec![
            Asset::stock("MSFT").unwrap(),
            Asset::stock("AAPL").unwrap(),
            Asset::stock("GOOG").unwrap(),
            Asset::stock("msft").unwrap(),
        ];

        let comparison = coordinator
            .compare_assets(&assets, &agents, ExecutionOptions::parallel(3))
            .await
            .unwrap();

        assert_eq!(comparison.reports.len(), 3);
        assert_eq!(tracked.order.lock().unwrap().len(), 6);
        assert!(tracked.peak.load(Ordering::SeqCst) <= 3);
        // Equal scores rank by symbol
        let ranked: Vec<&str> = comparison
            .ranking
            .iter()
            .map(|r| r.symbol.as_str())
            .collect();
        assert_eq!(ranked, vec!["AAPL", "GOOG", "MSFT"]);
    }

    #[tokio::test]
    async fn test_batch_keeps_per_asset_errors() {
        let coordinator = coordinator(BudgetTracker::unlimited());
        let tracked = TrackedAgents::new();
        let good = tracked.agent("good", 1, Some(Recommendation::Hold));
        let assets = vec![Asset::stock("AAPL").unwrap(), Asset::crypto("BTC").unwrap()];

        let reports = coordinator
            .batch_analyze(&assets, &[good], ExecutionOptions::sequential())
            .await
            .unwrap();
        assert!(reports["AAPL"].is_ok());
        assert!(reports["BTC"].is_ok());

        let failing = tracked.agent("bad", 1, None);
        let reports = coordinator
            .batch_analyze(&assets, &[failing], ExecutionOptions::default())
            .await
            .unwrap();
        assert!(reports.values().all(Result::is_err));
    }

    #[test]
    fn test_compare_rejects_empty_input() {
        let coordinator = coordinator(BudgetTracker::unlimited());
        let result = tokio_test::block_on(coordinator.compare_assets(
            &[],
            &[],
            ExecutionOptions::default(),
        ));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = CoordinatorConfig::default();
        config.max_workers = 0;
        assert!(TaskCoordinator::builder().config(config).build().is_err());
    }

    #[test]
    fn test_availability_snapshot_is_replaceable() {
        let coordinator = coordinator(BudgetTracker::unlimited());
        assert!(coordinator.availability().is_available(ProviderId::OpenAI));

        let clone = coordinator.clone();
        clone.set_availability(ProviderAvailability::none().with(ProviderId::Groq, true));
        assert!(!coordinator.availability().is_available(ProviderId::OpenAI));
        assert!(coordinator.availability().is_available(ProviderId::Groq));
    }
}
