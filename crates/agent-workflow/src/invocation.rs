//! Per-agent invocation
//!
//! One invocation drives a single agent through routing, budget reservation,
//! dispatch, retry and provider fallback until it reaches a terminal state.
//!
//! ```text
//! Pending -> Dispatched -> Ok
//!    |           |  ^
//!    |           v  |
//!    |        Retrying -> Failed
//!    +-> Skipped / Failed
//! ```

use agent_core::{AgentInvoker, AgentOutput, AgentResult, Asset, Error, ModelRef, ProviderId};
use agent_llm::ProviderAvailability;
use agent_runtime::{BudgetTracker, RetryPolicy, RouteRequest, Router};
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Lifecycle of one agent invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationState {
    Pending,
    Dispatched,
    Retrying,
    Ok,
    Failed,
    Skipped,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ok | Self::Failed | Self::Skipped)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use InvocationState::{Dispatched, Failed, Ok, Pending, Retrying, Skipped};
        matches!(
            (self, next),
            (Pending, Dispatched | Skipped | Failed)
                | (Dispatched, Ok | Retrying | Failed)
                | (Retrying, Dispatched | Failed)
        )
    }
}

impl fmt::Display for InvocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
            Self::Retrying => "retrying",
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(name)
    }
}

/// Shared collaborators an invocation runs against
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub router: Arc<Router>,
    pub budget: Arc<BudgetTracker>,
    /// Snapshot taken when the request started
    pub availability: ProviderAvailability,
    pub retry: RetryPolicy,
    pub call_timeout: Duration,
    pub provider_fallback: bool,
}

enum Attempt {
    Output(AgentOutput),
    Error(Error),
    Panicked(String),
}

/// A single agent run against a single asset
pub struct Invocation {
    agent: Arc<dyn AgentInvoker>,
    asset: Asset,
    state: InvocationState,
    attempts: u32,
    cost: f64,
    excluded: BTreeSet<ProviderId>,
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("agent", &self.agent.name())
            .field("asset", &self.asset)
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .field("cost", &self.cost)
            .field("excluded", &self.excluded)
            .finish()
    }
}

impl Invocation {
    pub fn new(agent: Arc<dyn AgentInvoker>, asset: Asset) -> Self {
        Self {
            agent,
            asset,
            state: InvocationState::Pending,
            attempts: 0,
            cost: 0.0,
            excluded: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    /// Provider calls made so far, across all providers
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Providers excluded after they failed
    pub fn excluded(&self) -> &BTreeSet<ProviderId> {
        &self.excluded
    }

    fn transition(&mut self, next: InvocationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {next}",
            self.state
        );
        trace!(agent = self.agent.name(), from = %self.state, to = %next, "Invocation state");
        self.state = next;
    }

    fn skip(&mut self, reason: &str) -> AgentResult {
        self.transition(InvocationState::Skipped);
        debug!(agent = self.agent.name(), asset = %self.asset, reason, "Agent skipped");
        AgentResult::skipped(self.agent.name(), reason)
    }

    fn fail(&mut self, error: impl fmt::Display, model: Option<ModelRef>) -> AgentResult {
        self.transition(InvocationState::Failed);
        warn!(
            agent = self.agent.name(),
            asset = %self.asset,
            attempts = self.attempts,
            error = %error,
            "Agent failed"
        );
        AgentResult::failed(self.agent.name(), error, model, self.cost, self.attempts)
    }

    async fn dispatch(&self, model: &ModelRef, call_timeout: Duration) -> Attempt {
        let call = AssertUnwindSafe(self.agent.invoke(&self.asset, model)).catch_unwind();
        match tokio::time::timeout(call_timeout, call).await {
            Ok(Ok(Ok(output))) => Attempt::Output(output),
            Ok(Ok(Err(error))) => Attempt::Error(error),
            Ok(Err(payload)) => Attempt::Panicked(panic_message(payload.as_ref())),
            Err(_) => Attempt::Error(Error::Timeout {
                provider: model.provider,
                elapsed_ms: u64::try_from(call_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// Drive the invocation to a terminal state
    pub async fn run(&mut self, ctx: &InvocationContext) -> AgentResult {
        if ctx.budget.is_exhausted() {
            return self.skip("session budget exhausted");
        }

        let usage = self.agent.estimated_usage();
        let mut last_failure: Option<(Error, ModelRef)> = None;

        loop {
            // Candidates priced above what is left of the session are passed over
            let request = RouteRequest {
                complexity: self.agent.complexity(),
                excluded: self.excluded.clone(),
                max_cost: ctx.budget.remaining(),
                usage: Some(usage),
                ..RouteRequest::default()
            };
            let entry = match ctx.router.route_entry(&request, &ctx.availability) {
                Ok(entry) => entry,
                Err(route_error) => {
                    return match (last_failure.take(), route_error) {
                        (Some((error, model)), _) => self.fail(error, Some(model)),
                        (None, Error::BudgetExceeded { .. }) if self.attempts == 0 => {
                            self.skip("estimated cost exceeds the session budget")
                        }
                        (None, route_error) => self.fail(route_error, None),
                    };
                }
            };
            let model = entry.model_ref();
            let estimate = entry.estimate_cost(usage.input_tokens, usage.output_tokens);
            let mut retries = 0;

            let error = loop {
                let Some(reservation) = ctx.budget.try_reserve(estimate) else {
                    if self.attempts == 0 {
                        return self.skip("estimated cost exceeds the session budget");
                    }
                    return self.fail("session budget reached before the next attempt", Some(model));
                };

                self.transition(InvocationState::Dispatched);
                self.attempts += 1;
                debug!(
                    agent = self.agent.name(),
                    asset = %self.asset,
                    %model,
                    attempt = self.attempts,
                    "Dispatching agent"
                );

                match self.dispatch(&model, ctx.call_timeout).await {
                    Attempt::Output(output) => {
                        let actual = entry
                            .estimate_cost(output.usage.input_tokens, output.usage.output_tokens);
                        reservation.commit(actual);
                        self.cost += actual;
                        self.transition(InvocationState::Ok);
                        return AgentResult::ok(
                            self.agent.name(),
                            output,
                            model,
                            self.cost,
                            self.attempts,
                        );
                    }
                    Attempt::Panicked(message) => {
                        drop(reservation);
                        return self.fail(format!("agent panicked: {message}"), Some(model));
                    }
                    Attempt::Error(error) => {
                        drop(reservation);
                        if !ctx.retry.should_retry(retries, &error) {
                            break error;
                        }
                        retries += 1;
                        self.transition(InvocationState::Retrying);
                        let backoff = ctx.retry.backoff_duration(retries);
                        warn!(
                            agent = self.agent.name(),
                            %model,
                            retry = retries,
                            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                            error = %error,
                            "Retrying agent"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                }
            };

            if ctx.provider_fallback && error.is_retryable() {
                self.excluded.insert(model.provider);
                self.transition(InvocationState::Retrying);
                warn!(
                    agent = self.agent.name(),
                    provider = %model.provider,
                    error = %error,
                    "Provider exhausted, re-routing"
                );
                last_failure = Some((error, model));
                continue;
            }

            return self.fail(error, Some(model));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{AgentStatus, Recommendation, TaskComplexity, TokenUsage};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Script = Box<dyn Fn(&ModelRef) -> agent_core::Result<AgentOutput> + Send + Sync>;

    /// Agent whose behaviour is a queue of per-call scripts
    struct Scripted {
        name: &'static str,
        steps: Mutex<VecDeque<Script>>,
        calls: Mutex<Vec<ModelRef>>,
    }

    impl Scripted {
        fn new(name: &'static str, steps: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                name,
                steps: Mutex::new(steps.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<ModelRef> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AgentInvoker for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn invoke(&self, _asset: &Asset, model: &ModelRef) -> agent_core::Result<AgentOutput> {
            self.calls.lock().unwrap().push(model.clone());
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(step) => step(model),
                None => panic!("script exhausted"),
            }
        }
    }

    fn buy() -> Script {
        Box::new(|_| {
            Ok(AgentOutput::new(
                Recommendation::Buy,
                8.0,
                "Earnings beat.",
                TokenUsage::new(100, 50),
            ))
        })
    }

    fn provider_error() -> Script {
        Box::new(|model| {
            Err(Error::Provider {
                provider: model.provider,
                message: "HTTP 503".into(),
            })
        })
    }

    fn context(availability: ProviderAvailability, budget: BudgetTracker) -> InvocationContext {
        InvocationContext {
            router: Arc::new(Router::builtin()),
            budget: Arc::new(budget),
            availability,
            retry: RetryPolicy::fast(),
            call_timeout: Duration::from_secs(5),
            provider_fallback: true,
        }
    }

    fn openai_and_groq() -> ProviderAvailability {
        ProviderAvailability::none()
            .with(ProviderId::OpenAI, true)
            .with(ProviderId::Groq, true)
    }

    fn asset() -> Asset {
        Asset::stock("AAPL").unwrap()
    }

    #[test]
    fn test_transitions() {
        use InvocationState::*;
        assert!(Pending.can_transition_to(Dispatched));
        assert!(Pending.can_transition_to(Skipped));
        assert!(Dispatched.can_transition_to(Retrying));
        assert!(Retrying.can_transition_to(Dispatched));
        assert!(Retrying.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Ok));
        assert!(!Dispatched.can_transition_to(Skipped));
        assert!(!Ok.can_transition_to(Dispatched));
        assert!(!Failed.can_transition_to(Retrying));
        assert!(Ok.is_terminal() && Failed.is_terminal() && Skipped.is_terminal());
        assert!(!Retrying.is_terminal());
    }

    #[tokio::test]
    async fn test_success_commits_metered_cost() {
        let agent = Scripted::new("fundamental", vec![buy()]);
        let ctx = context(openai_and_groq(), BudgetTracker::with_cap(1.0));
        let mut invocation = Invocation::new(agent.clone(), asset());

        let result = invocation.run(&ctx).await;

        assert_eq!(result.status, AgentStatus::Ok);
        assert_eq!(invocation.state(), InvocationState::Ok);
        assert_eq!(result.attempts, 1);
        // gpt-4o-mini at 100 in / 50 out
        assert_eq!(result.model, Some(ModelRef::new(ProviderId::OpenAI, "gpt-4o-mini")));
        assert!((result.cost - 0.000_045).abs() < 1e-12);
        assert!((ctx.budget.spent() - 0.000_045).abs() < 1e-12);
        assert_eq!(ctx.budget.status().reserved_usd, 0.0);
        assert_eq!(agent.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let agent = Scripted::new("technical", vec![provider_error(), provider_error(), buy()]);
        let ctx = context(openai_and_groq(), BudgetTracker::unlimited());
        let mut invocation = Invocation::new(agent.clone(), asset());

        let result = invocation.run(&ctx).await;

        assert!(result.is_ok());
        assert_eq!(result.attempts, 3);
        assert!(agent.calls().iter().all(|m| m.provider == ProviderId::OpenAI));
        assert!(invocation.excluded().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_after_retries_exhausted() {
        let agent = Scripted::new(
            "stock_analyst",
            vec![provider_error(), provider_error(), provider_error(), buy()],
        );
        let ctx = context(openai_and_groq(), BudgetTracker::unlimited());
        let mut invocation = Invocation::new(agent.clone(), asset());

        let result = invocation.run(&ctx).await;

        assert!(result.is_ok());
        assert_eq!(result.attempts, 4);
        assert_eq!(result.model.unwrap().provider, ProviderId::Groq);
        let providers: Vec<ProviderId> = agent.calls().iter().map(|m| m.provider).collect();
        assert_eq!(
            providers,
            vec![ProviderId::OpenAI, ProviderId::OpenAI, ProviderId::OpenAI, ProviderId::Groq]
        );
        assert!(invocation.excluded().contains(&ProviderId::OpenAI));
    }

    #[tokio::test]
    async fn test_all_providers_exhausted_reports_last_error() {
        let steps = (0..6).map(|_| provider_error()).collect();
        let agent = Scripted::new("fundamental", steps);
        let ctx = context(openai_and_groq(), BudgetTracker::unlimited());
        let mut invocation = Invocation::new(agent.clone(), asset());

        let result = invocation.run(&ctx).await;

        assert_eq!(result.status, AgentStatus::Failed);
        assert_eq!(invocation.state(), InvocationState::Failed);
        assert_eq!(result.attempts, 6);
        assert_eq!(result.model.unwrap().provider, ProviderId::Groq);
        assert!(result.error.unwrap().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_no_fallback_when_disabled() {
        let steps = (0..3).map(|_| provider_error()).collect();
        let agent = Scripted::new("fundamental", steps);
        let mut ctx = context(openai_and_groq(), BudgetTracker::unlimited());
        ctx.provider_fallback = false;
        let mut invocation = Invocation::new(agent.clone(), asset());

        let result = invocation.run(&ctx).await;

        assert_eq!(result.status, AgentStatus::Failed);
        assert_eq!(agent.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let malformed: Script = Box::new(|_| Err(Error::MalformedResponse("no verdict".into())));
        let agent = Scripted::new("technical", vec![malformed]);
        let ctx = context(openai_and_groq(), BudgetTracker::unlimited());
        let mut invocation = Invocation::new(agent.clone(), asset());

        let result = invocation.run(&ctx).await;

        assert_eq!(result.status, AgentStatus::Failed);
        assert_eq!(result.attempts, 1);
        assert!(invocation.excluded().is_empty());
    }

    struct Slow;

    #[async_trait]
    impl AgentInvoker for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn invoke(&self, _asset: &Asset, _model: &ModelRef) -> agent_core::Result<AgentOutput> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(Error::MalformedResponse("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_timeout_is_a_failed_attempt() {
        let mut ctx = context(openai_and_groq(), BudgetTracker::unlimited());
        ctx.call_timeout = Duration::from_millis(10);
        ctx.retry = RetryPolicy::no_retry();
        ctx.provider_fallback = false;
        let mut invocation = Invocation::new(Arc::new(Slow), asset());

        let result = invocation.run(&ctx).await;

        assert_eq!(result.status, AgentStatus::Failed);
        assert_eq!(result.attempts, 1);
        assert_eq!(
            result.error.as_deref(),
            Some("Provider openai timed out after 10ms")
        );
    }

    #[tokio::test]
    async fn test_skipped_when_estimate_exceeds_cap() {
        let agent = Scripted::new("fundamental", vec![buy()]);
        // gpt-4o-mini reserves 0.00045 at the default usage
        let ctx = context(openai_and_groq(), BudgetTracker::with_cap(0.0001));
        let mut invocation = Invocation::new(agent.clone(), asset());

        let result = invocation.run(&ctx).await;

        assert_eq!(result.status, AgentStatus::Skipped);
        assert_eq!(invocation.state(), InvocationState::Skipped);
        assert_eq!(result.attempts, 0);
        assert!(agent.calls().is_empty());
    }

    #[tokio::test]
    async fn test_skipped_when_budget_exhausted() {
        let budget = BudgetTracker::with_cap(0.01);
        budget.commit(0.0, 0.01);
        let agent = Scripted::new("fundamental", vec![buy()]);
        let ctx = context(ProviderAvailability::all_available(), budget);

        let result = Invocation::new(agent.clone(), asset()).run(&ctx).await;

        assert_eq!(result.status, AgentStatus::Skipped);
        assert!(agent.calls().is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_failed_without_retry() {
        let agent = Scripted::new("broken", Vec::new());
        let ctx = context(openai_and_groq(), BudgetTracker::unlimited());
        let mut invocation = Invocation::new(agent.clone(), asset());

        let result = invocation.run(&ctx).await;

        assert_eq!(result.status, AgentStatus::Failed);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.error.as_deref(), Some("agent panicked: script exhausted"));
        assert_eq!(ctx.budget.status().reserved_usd, 0.0);
    }

    struct Critical;

    #[async_trait]
    impl AgentInvoker for Critical {
        fn name(&self) -> &str {
            "critical"
        }

        async fn invoke(&self, _asset: &Asset, _model: &ModelRef) -> agent_core::Result<AgentOutput> {
            Err(Error::MalformedResponse("unreachable".into()))
        }

        fn complexity(&self) -> TaskComplexity {
            TaskComplexity::Critical
        }
    }

    #[tokio::test]
    async fn test_no_eligible_provider() {
        // Groq only serves Moderate and Simple models
        let ctx = context(
            ProviderAvailability::none().with(ProviderId::Groq, true),
            BudgetTracker::unlimited(),
        );
        let mut invocation = Invocation::new(Arc::new(Critical), asset());

        let result = invocation.run(&ctx).await;

        assert_eq!(result.status, AgentStatus::Failed);
        assert_eq!(result.attempts, 0);
        assert_eq!(
            result.error.as_deref(),
            Some("No provider available for critical task")
        );
    }

    /// Critical agent that always answers
    struct CriticalBuy;

    #[async_trait]
    impl AgentInvoker for CriticalBuy {
        fn name(&self) -> &str {
            "critical_buy"
        }

        async fn invoke(&self, _asset: &Asset, _model: &ModelRef) -> agent_core::Result<AgentOutput> {
            Ok(AgentOutput::new(
                Recommendation::Buy,
                7.0,
                "Margins expanding.",
                TokenUsage::new(1000, 500),
            ))
        }

        fn complexity(&self) -> TaskComplexity {
            TaskComplexity::Critical
        }
    }

    #[tokio::test]
    async fn test_routes_past_candidates_above_remaining_budget() {
        let mut ctx = context(ProviderAvailability::all_available(), BudgetTracker::with_cap(0.01));
        let router = Router::new(
            Arc::new(agent_llm::ModelCatalog::builtin()),
            agent_runtime::RouterConfig::builder()
                .cost_optimization(false)
                .build(),
        )
        .unwrap();
        ctx.router = Arc::new(router.with_budget(Arc::clone(&ctx.budget)));
        let mut invocation = Invocation::new(Arc::new(CriticalBuy), asset());

        let result = invocation.run(&ctx).await;

        // The priority head costs more than 0.01 at 1000/500; gpt-4o fits
        assert_eq!(result.status, AgentStatus::Ok);
        assert_eq!(result.model, Some(ModelRef::new(ProviderId::OpenAI, "gpt-4o")));
        assert!((result.cost - 0.0075).abs() < 1e-12);
        assert!(ctx.budget.spent() <= 0.01);
    }

    #[tokio::test]
    async fn test_skipped_when_no_candidate_fits_remaining_budget() {
        let budget = BudgetTracker::with_cap(0.01);
        budget.commit(0.0, 0.005);
        let ctx = context(ProviderAvailability::all_available(), budget);
        let mut invocation = Invocation::new(Arc::new(CriticalBuy), asset());

        let result = invocation.run(&ctx).await;

        assert_eq!(result.status, AgentStatus::Skipped);
        assert_eq!(
            result.error.as_deref(),
            Some("estimated cost exceeds the session budget")
        );
        assert_eq!(result.attempts, 0);
    }
}
