//! Retry policy with exponential backoff

use agent_core::{Error, Result};
use std::time::Duration;

/// How often and how patiently a failed provider call is retried
///
/// `max_retries` counts retries after the first attempt, so a call is
/// attempted at most `max_retries + 1` times per provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries per provider
    pub max_retries: u32,

    /// Backoff before the first retry
    pub initial_backoff: Duration,

    /// Upper bound on any single backoff
    pub max_backoff: Duration,

    /// Backoff multiplier (typically 2.0 for exponential backoff)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_retries: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
            backoff_multiplier,
        }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Create a policy with fast retries (for testing)
    pub fn fast() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    /// Backoff before retry number `retry` (1-based); zero for `retry == 0`
    pub fn backoff_duration(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let backoff_ms =
            self.initial_backoff.as_millis() as f64 * self.backoff_multiplier.powi(exponent);

        if !backoff_ms.is_finite() || backoff_ms >= self.max_backoff.as_millis() as f64 {
            self.max_backoff
        } else {
            Duration::from_millis(backoff_ms as u64)
        }
    }

    /// Whether to retry after `retries_done` retries failed with `error`
    pub fn should_retry(&self, retries_done: u32, error: &Error) -> bool {
        error.is_retryable() && retries_done < self.max_retries
    }

    pub fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::Config(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(Error::Config(
                "initial_backoff must not exceed max_backoff".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::ProviderId;

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::new(
            5,
            Duration::from_millis(100),
            Duration::from_secs(1),
            2.0,
        );

        assert_eq!(policy.backoff_duration(0), Duration::ZERO);
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_duration(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_duration(4), Duration::from_millis(800));
        // Capped at max_backoff
        assert_eq!(policy.backoff_duration(5), Duration::from_secs(1));
        assert_eq!(policy.backoff_duration(60), Duration::from_secs(1));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_duration(2), Duration::from_secs(1));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::fast();
        let transient = Error::Provider {
            provider: ProviderId::OpenAI,
            message: "HTTP 502".into(),
        };
        let permanent = Error::MalformedResponse("no verdict".into());

        assert!(policy.should_retry(0, &transient));
        assert!(policy.should_retry(1, &transient));
        assert!(!policy.should_retry(2, &transient));
        assert!(!policy.should_retry(0, &permanent));
        assert!(!RetryPolicy::no_retry().should_retry(0, &transient));
    }

    #[test]
    fn test_validation() {
        let mut policy = RetryPolicy::fast();
        policy.backoff_multiplier = 0.5;
        assert!(policy.validate().is_err());

        let inverted = RetryPolicy::new(1, Duration::from_secs(2), Duration::from_secs(1), 2.0);
        assert!(inverted.validate().is_err());
    }
}
