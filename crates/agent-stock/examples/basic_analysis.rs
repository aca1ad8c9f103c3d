//! Basic consensus analysis example
//!
//! Runs the default analyst set for a stock against whichever providers
//! have credentials, with a small session budget.
//!
//! To run this example:
//! ```bash
//! # At least one of OPENAI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY, GOOGLE_API_KEY
//! export GROQ_API_KEY=your_key_here
//!
//! cargo run -p agent-stock --example basic_analysis AAPL
//! ```

use agent_core::{Asset, AssetClass};
use agent_llm::{ProviderRegistry, ProvidersConfig};
use agent_runtime::{BudgetTracker, Router};
use agent_stock::{AgentKind, AnalystConfig, LlmAnalyst};
use agent_workflow::{CoordinatorConfig, TaskCoordinator};
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agent_utils::init_tracing();

    let symbol = env::args().nth(1).unwrap_or_else(|| "AAPL".to_string());
    let asset = Asset::stock(&symbol)?;

    let registry = Arc::new(ProviderRegistry::from_env(&ProvidersConfig::default())?);
    anyhow::ensure!(!registry.is_empty(), "no provider API key is set");

    let budget = Arc::new(BudgetTracker::with_cap(0.05));
    let router = Arc::new(Router::builtin().with_budget(Arc::clone(&budget)));

    let config = CoordinatorConfig::default();
    let options = config.options();
    let coordinator = TaskCoordinator::builder()
        .router(router)
        .budget(Arc::clone(&budget))
        .config(config)
        .availability(registry.availability())
        .build()?;

    let agents = LlmAnalyst::set_for(
        &asset,
        &AgentKind::default_set(AssetClass::Stock),
        &registry,
        &Arc::new(AnalystConfig::default()),
    )?;

    println!("=== Analyzing {asset} with {} agents ===\n", agents.len());
    let report = coordinator
        .analyze_comprehensive(&asset, &agents, options)
        .await?;

    println!(
        "{}: {} (confidence {:.1}/10, agreement {:.0}%)\n",
        report.asset,
        report.recommendation,
        report.confidence,
        report.agreement * 100.0
    );
    println!("{}\n", report.summary());

    let status = budget.status();
    println!("Spent ${:.6} of ${:.2}", status.spent_usd, status.cap_usd.unwrap_or_default());

    Ok(())
}
