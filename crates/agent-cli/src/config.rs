//! CLI configuration file
//!
//! `finagent.json` in the working directory is merged over
//! `~/.config/agent-rs/finagent.json`; keys in the project file win.

use agent_core::{Error, ModelRef, Result};
use agent_llm::{CatalogConfig, ModelCatalog, ProvidersConfig};
use agent_runtime::{BudgetConfig, BudgetTracker, RetryPolicy, Router, RouterConfig};
use agent_stock::AnalystConfig;
use agent_utils::config::{ConfigError, load_json_optional, merge_json, user_config_dir};
use agent_workflow::CoordinatorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Name of the configuration file at both levels
pub const CONFIG_FILE: &str = "finagent.json";

/// `router` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSection {
    pub cost_optimization: bool,
    /// `provider/model`
    pub default_model: Option<String>,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            cost_optimization: true,
            default_model: None,
        }
    }
}

/// `coordinator` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSection {
    pub max_workers: usize,
    pub parallel: bool,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub call_timeout_secs: u64,
    pub provider_fallback: bool,
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            max_workers: 4,
            parallel: true,
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            call_timeout_secs: 120,
            provider_fallback: true,
        }
    }
}

/// `logging` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive; `RUST_LOG` overrides it
    pub filter: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

/// Whole configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: Option<CatalogConfig>,
    pub router: RouterSection,
    pub budget: BudgetConfig,
    pub coordinator: CoordinatorSection,
    pub analyst: AnalystConfig,
    pub providers: ProvidersConfig,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load the user-level file overlaid by the project-level file
    ///
    /// Missing files are skipped; with neither present the defaults apply.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let mut merged = serde_json::Value::Object(serde_json::Map::new());

        match user_config_dir() {
            Ok(dir) => {
                if let Some(user) = load_json_optional(dir.join(CONFIG_FILE))? {
                    merge_json(&mut merged, user);
                }
            }
            Err(ConfigError::NoHomeDir) => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(project) = load_json_optional(project_dir.join(CONFIG_FILE))? {
            merge_json(&mut merged, project);
        }

        Self::from_value(merged)
    }

    /// Load exactly one file
    pub fn load_file(path: &Path) -> Result<Self> {
        let value = load_json_optional(path)?.ok_or_else(|| {
            Error::Config(format!("config file not found: {}", path.display()))
        })?;
        Self::from_value(value)
    }

    fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| Error::from(ConfigError::Invalid(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.budget.validate()?;
        self.analyst.validate()?;
        self.coordinator_config()?;
        self.default_model()?;
        Ok(())
    }

    fn default_model(&self) -> Result<Option<ModelRef>> {
        self.router
            .default_model
            .as_deref()
            .map(str::parse)
            .transpose()
    }

    /// Catalog from the `catalog` section, or the built-in one
    pub fn catalog(&self) -> Result<ModelCatalog> {
        match &self.catalog {
            Some(section) => ModelCatalog::from_config(section.clone()),
            None => Ok(ModelCatalog::builtin()),
        }
    }

    /// Router over the configured catalog, capped by `budget`
    pub fn router(&self, budget: &Arc<BudgetTracker>) -> Result<Router> {
        let mut config = RouterConfig::builder().cost_optimization(self.router.cost_optimization);
        if let Some(model) = self.default_model()? {
            config = config.default_model(model);
        }
        Ok(Router::new(Arc::new(self.catalog()?), config.build())?.with_budget(Arc::clone(budget)))
    }

    /// Session budget, with `cap_override` taking precedence over the file
    pub fn budget(&self, cap_override: Option<f64>) -> Result<BudgetTracker> {
        let mut section = self.budget.clone();
        if cap_override.is_some() {
            section.session_cap_usd = cap_override;
        }
        BudgetTracker::from_config(&section)
    }

    pub fn coordinator_config(&self) -> Result<CoordinatorConfig> {
        let section = &self.coordinator;
        let initial = Duration::from_millis(section.initial_backoff_ms);
        let max = Duration::from_millis(section.max_backoff_ms.max(section.initial_backoff_ms));

        CoordinatorConfig::builder()
            .max_workers(section.max_workers)
            .parallel(section.parallel)
            .retry(RetryPolicy::new(section.max_retries, initial, max, 2.0))
            .call_timeout(Duration::from_secs(section.call_timeout_secs))
            .provider_fallback(section.provider_fallback)
            .build()
    }
}
