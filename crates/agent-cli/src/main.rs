//! Command-line interface for agent-rs

mod config;
mod render;

use crate::config::AppConfig;
use agent_core::{Asset, AssetClass, ModelRef, ProviderId, TaskComplexity, TaskType, TokenUsage};
use agent_llm::{ProviderAvailability, ProviderRegistry};
use agent_runtime::{BudgetTracker, REFERENCE_USAGE, RouteRequest, Router};
use agent_stock::{AgentKind, LlmAnalyst};
use agent_workflow::{ExecutionOptions, SharedAgent, TaskCoordinator};
use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "agent-cli", version)]
#[command(about = "Multi-model consensus analysis for stocks and crypto", long_about = None)]
struct Cli {
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Read this configuration file instead of the user and project files
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Session spending cap in USD
    #[arg(long, global = true)]
    budget: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Comma-separated analysts; defaults depend on the asset class
    #[arg(long, value_delimiter = ',')]
    agents: Vec<AgentKind>,

    /// Run analysts one at a time, in the order given
    #[arg(long)]
    sequential: bool,

    /// Worker pool size
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List catalog models with pricing and availability
    Models,

    /// Show the model a task of the given complexity routes to
    Route {
        complexity: TaskComplexity,

        /// Providers to leave out (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<ProviderId>,

        /// Maximum cost per call in USD
        #[arg(long)]
        max_cost: Option<f64>,

        /// Minimum context window in tokens
        #[arg(long)]
        min_context: Option<u32>,
    },

    /// Recommend a model for a task type within a cost limit
    Recommend {
        /// quick_lookup, screening, comparison, analysis, deep_analysis, ...
        task_type: String,

        /// Maximum cost per call in USD
        #[arg(long)]
        max_cost: Option<f64>,
    },

    /// Estimate the cost of one call
    Estimate {
        /// `provider/model`
        model: ModelRef,

        #[arg(default_value_t = REFERENCE_USAGE.input_tokens)]
        input_tokens: u32,

        #[arg(default_value_t = REFERENCE_USAGE.output_tokens)]
        output_tokens: u32,
    },

    /// Analyse a stock
    Analyze {
        ticker: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Analyse a crypto asset
    Crypto {
        symbol: String,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Analyse several assets and rank them
    Compare {
        #[arg(required = true, num_args = 2..)]
        tickers: Vec<String>,

        /// Treat the symbols as crypto assets
        #[arg(long)]
        crypto: bool,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Analyse several assets independently
    Batch {
        #[arg(required = true)]
        tickers: Vec<String>,

        /// Treat the symbols as crypto assets
        #[arg(long)]
        crypto: bool,

        #[command(flatten)]
        run: RunArgs,
    },
}

enum Analysis {
    Single,
    Compare,
    Batch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_file(path),
        None => AppConfig::load(&std::env::current_dir()?),
    }
    .context("failed to load configuration")?;

    agent_utils::init_tracing_with(config.logging.filter.as_deref(), config.logging.json);

    let budget = Arc::new(config.budget(cli.budget)?);
    let router = Arc::new(config.router(&budget)?);

    match cli.command {
        Command::Models => {
            let availability = ProviderAvailability::from_env();
            if cli.json {
                print_json(&render::catalog_json(router.catalog(), &availability))?;
            } else {
                let entries: Vec<_> = router.catalog().entries().iter().collect();
                println!(
                    "{}",
                    render::models_table(&entries, &availability, REFERENCE_USAGE)
                );
            }
        }

        Command::Route {
            complexity,
            exclude,
            max_cost,
            min_context,
        } => {
            let mut request = RouteRequest::new(complexity);
            request.excluded.extend(exclude);
            request.max_cost = max_cost;
            request.min_context = min_context;

            let availability = ProviderAvailability::from_env();
            let entry = router.route_entry(&request, &availability)?;
            if cli.json {
                print_json(&json!({
                    "complexity": complexity,
                    "model": entry.model_ref(),
                    "estimated_cost": entry.estimate_cost(REFERENCE_USAGE.input_tokens, REFERENCE_USAGE.output_tokens),
                }))?;
            } else {
                println!("{complexity} -> {}", entry.model_ref());
                println!(
                    "{}",
                    render::models_table(&router.candidates(complexity), &availability, REFERENCE_USAGE)
                );
            }
        }

        Command::Recommend {
            task_type,
            max_cost,
        } => {
            let task_type = TaskType::from(task_type.as_str());
            let model =
                router.recommend_model(task_type, max_cost, &ProviderAvailability::from_env())?;
            if cli.json {
                print_json(&json!({ "task_type": task_type, "model": model }))?;
            } else {
                println!("{task_type} ({}) -> {model}", task_type.complexity());
            }
        }

        Command::Estimate {
            model,
            input_tokens,
            output_tokens,
        } => {
            let cost = router.estimate_cost(model.provider, &model.model, input_tokens, output_tokens)?;
            if cli.json {
                print_json(&json!({
                    "model": model,
                    "usage": TokenUsage::new(input_tokens, output_tokens),
                    "cost_usd": cost,
                }))?;
            } else {
                println!("{model}: {input_tokens} in / {output_tokens} out = ${cost:.6}");
            }
        }

        Command::Analyze { ticker, run } => {
            let assets = vec![Asset::stock(&ticker)?];
            analyze(cli.json, &config, router, budget, &assets, &run, Analysis::Single).await?;
        }

        Command::Crypto { symbol, run } => {
            let assets = vec![Asset::crypto(&symbol)?];
            analyze(cli.json, &config, router, budget, &assets, &run, Analysis::Single).await?;
        }

        Command::Compare {
            tickers,
            crypto,
            run,
        } => {
            let assets = parse_assets(&tickers, crypto)?;
            analyze(cli.json, &config, router, budget, &assets, &run, Analysis::Compare).await?;
        }

        Command::Batch {
            tickers,
            crypto,
            run,
        } => {
            let assets = parse_assets(&tickers, crypto)?;
            analyze(cli.json, &config, router, budget, &assets, &run, Analysis::Batch).await?;
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_assets(symbols: &[String], crypto: bool) -> anyhow::Result<Vec<Asset>> {
    let class = if crypto {
        AssetClass::Crypto
    } else {
        AssetClass::Stock
    };
    symbols
        .iter()
        .map(|symbol| Asset::new(symbol, class).map_err(Into::into))
        .collect()
}

fn execution_options(config: &AppConfig, run: &RunArgs) -> anyhow::Result<ExecutionOptions> {
    let mut options = config.coordinator_config()?.options();
    if let Some(workers) = run.workers {
        options.max_workers = workers;
    }
    if run.sequential {
        options.parallel = false;
    }
    Ok(options)
}

async fn analyze(
    json: bool,
    config: &AppConfig,
    router: Arc<Router>,
    budget: Arc<BudgetTracker>,
    assets: &[Asset],
    run: &RunArgs,
    mode: Analysis,
) -> anyhow::Result<()> {
    let registry = Arc::new(ProviderRegistry::from_env(&config.providers)?);
    if registry.is_empty() {
        let vars: Vec<&str> = ProviderId::ALL
            .iter()
            .map(ProviderId::credential_env_var)
            .collect();
        bail!("no provider credentials found; set one of {}", vars.join(", "));
    }

    let class = assets.first().map_or(AssetClass::Stock, |asset| asset.class);
    let kinds = if run.agents.is_empty() {
        AgentKind::default_set(class)
    } else {
        run.agents.clone()
    };
    let analyst_config = Arc::new(config.analyst.clone());
    let agents: Vec<SharedAgent> = match assets.first() {
        Some(asset) => LlmAnalyst::set_for(asset, &kinds, &registry, &analyst_config)?,
        None => Vec::new(),
    };

    let coordinator = TaskCoordinator::builder()
        .router(router)
        .budget(Arc::clone(&budget))
        .config(config.coordinator_config()?)
        .availability(registry.availability())
        .build()?;
    let options = execution_options(config, run)?;
    debug!(
        agents = ?kinds,
        parallel = options.parallel,
        workers = options.pool_size(),
        "Analysts ready"
    );

    match mode {
        Analysis::Single => {
            let asset = assets.first().context("no asset given")?;
            let report = coordinator
                .analyze_comprehensive(asset, &agents, options)
                .await?;
            if json {
                print_json(&json!(report))?;
            } else {
                println!("{}", render::report_text(&report));
            }
        }
        Analysis::Compare => {
            let comparison = coordinator.compare_assets(assets, &agents, options).await?;
            if json {
                print_json(&render::comparison_json(&comparison))?;
            } else {
                println!("{}", render::comparison_text(&comparison));
            }
        }
        Analysis::Batch => {
            let reports = coordinator.batch_analyze(assets, &agents, options).await?;
            if json {
                print_json(&render::reports_json(&reports))?;
            } else {
                println!("{}", render::batch_text(&reports));
            }
        }
    }

    eprintln!("{}", render::budget_line(&budget.status()));
    Ok(())
}
