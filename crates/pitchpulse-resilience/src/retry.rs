//! Retry policy for structured generation.
//!
//! A fixed number of attempts, each with its own hard timeout, separated by
//! a short random jitter. No exponential backoff.

use rand::Rng;
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of upstream attempts, including the first one
    pub max_attempts: u32,
    /// Hard timeout applied to each attempt independently
    pub attempt_timeout: Duration,
    /// Upper bound of the random pause between attempts
    pub jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            attempt_timeout: Duration::from_secs(8),
            jitter: Duration::from_millis(200),
        }
    }
}

/// Retry policy implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    ///
    /// A zero attempt budget is raised to one so every call reaches the
    /// upstream at least once.
    #[must_use]
    pub fn new(mut config: RetryConfig) -> Self {
        config.max_attempts = config.max_attempts.max(1);
        Self { config }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Create a policy with a custom attempt budget
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self::new(RetryConfig {
            max_attempts,
            ..Default::default()
        })
    }

    /// Total number of attempts
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Per-attempt timeout
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        self.config.attempt_timeout
    }

    /// Whether another attempt may follow attempt number `attempt` (1-based)
    #[must_use]
    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.config.max_attempts
    }

    /// Pause before the next attempt, uniform in `[0, jitter]`
    #[must_use]
    pub fn jitter_delay(&self) -> Duration {
        let max_ms = u64::try_from(self.config.jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

/// Builder for retry policy
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    config: RetryConfig,
}

impl RetryPolicyBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt budget
    #[must_use]
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    /// Set the per-attempt timeout
    #[must_use]
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.config.attempt_timeout = timeout;
        self
    }

    /// Set the jitter bound
    #[must_use]
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Build the policy
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        RetryPolicy::new(self.config)
    }
}
