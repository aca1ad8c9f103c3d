//! Coordinator configuration

use agent_core::{Error, Result};
use agent_runtime::RetryPolicy;
use std::time::Duration;

/// Settings for [`crate::TaskCoordinator`]
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Worker pool size for parallel execution
    pub max_workers: usize,

    /// Run agents concurrently; sequential in the given order otherwise
    pub parallel: bool,

    /// Retry policy for transient provider failures
    pub retry: RetryPolicy,

    /// Deadline for a single provider call
    pub call_timeout: Duration,

    /// Re-route to another provider once retries are exhausted
    pub provider_fallback: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            parallel: true,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(120),
            provider_fallback: true,
        }
    }
}

impl CoordinatorConfig {
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::Config("max_workers must be > 0".to_string()));
        }
        if self.call_timeout.is_zero() {
            return Err(Error::Config("call_timeout must be > 0".to_string()));
        }
        self.retry.validate()
    }

    /// Execution options implied by this configuration
    pub fn options(&self) -> ExecutionOptions {
        ExecutionOptions {
            parallel: self.parallel,
            max_workers: self.max_workers,
        }
    }
}

/// Builder for [`CoordinatorConfig`]
#[derive(Debug, Default)]
pub struct CoordinatorConfigBuilder {
    config: CoordinatorConfig,
}

impl CoordinatorConfigBuilder {
    pub fn max_workers(mut self, max_workers: usize) -> Self {
        self.config.max_workers = max_workers;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    pub fn provider_fallback(mut self, enabled: bool) -> Self {
        self.config.provider_fallback = enabled;
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<CoordinatorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Per-request execution options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOptions {
    pub parallel: bool,
    pub max_workers: usize,
}

impl ExecutionOptions {
    pub fn parallel(max_workers: usize) -> Self {
        Self {
            parallel: true,
            max_workers,
        }
    }

    pub fn sequential() -> Self {
        Self {
            parallel: false,
            max_workers: 1,
        }
    }

    /// Size of the worker pool: `max_workers`, or 1 when sequential
    pub fn pool_size(&self) -> usize {
        if self.parallel {
            self.max_workers.max(1)
        } else {
            1
        }
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        CoordinatorConfig::default().options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.max_workers, 4);
        assert!(config.parallel);
        assert!(config.provider_fallback);
        assert_eq!(config.call_timeout, Duration::from_secs(120));
        assert_eq!(config.retry.max_retries, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_validates() {
        assert!(CoordinatorConfig::builder().max_workers(0).build().is_err());
        assert!(
            CoordinatorConfig::builder()
                .call_timeout(Duration::ZERO)
                .build()
                .is_err()
        );

        let config = CoordinatorConfig::builder()
            .max_workers(8)
            .parallel(false)
            .retry(RetryPolicy::no_retry())
            .provider_fallback(false)
            .build()
            .unwrap();
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.options().pool_size(), 1);
    }

    #[test]
    fn test_pool_size() {
        assert_eq!(ExecutionOptions::parallel(6).pool_size(), 6);
        assert_eq!(ExecutionOptions::parallel(0).pool_size(), 1);
        assert_eq!(ExecutionOptions::sequential().pool_size(), 1);
        assert_eq!(ExecutionOptions::default().pool_size(), 4);
    }
}
