//! Configuration for batch conversion runs.
//!
//! All scheduling behaviour is controlled through [`BatchConfig`], built via
//! its [`BatchConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config across workers and to shrink the poll budget in
//! tests so the timeout path runs in milliseconds instead of half an hour.

use crate::error::ConvertError;
use std::time::Duration;

/// Configuration for a batch conversion run.
///
/// Built via [`BatchConfig::builder()`] or using [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use batchconv::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of entries converted in parallel. Minimum 1. Default: 2.
    ///
    /// Each entry is network-bound (upload, poll, download), so a small
    /// degree of parallelism hides most of the remote latency. Raising this
    /// past the service's per-account task limit only earns rate-limit
    /// errors.
    pub concurrency: usize,

    /// Delay between job status polls. Default: 3 seconds.
    ///
    /// The service processes most jobs in a handful of seconds; polling
    /// faster than this wastes requests without finishing sooner.
    pub poll_interval: Duration,

    /// Maximum number of status polls per job. Default: 600.
    ///
    /// 600 polls at the default interval is roughly 30 minutes, enough for
    /// large video transcodes. A job still running after that is reported as
    /// timed out rather than holding its worker forever.
    pub max_polls: u32,

    /// Upper bound on how long a run waits for submitted work. Default: 24 hours.
    ///
    /// The run always returns once every submitted entry reaches a terminal
    /// state; this bound only guarantees eventual return under a pathological
    /// hang in the service or the network stack.
    pub run_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            poll_interval: Duration::from_secs(3),
            max_polls: 600,
            run_timeout: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    pub fn max_polls(mut self, n: u32) -> Self {
        self.config.max_polls = n;
        self
    }

    pub fn run_timeout(mut self, timeout: Duration) -> Self {
        self.config.run_timeout = timeout;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, ConvertError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(ConvertError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        if c.max_polls == 0 {
            return Err(ConvertError::InvalidConfig(
                "poll budget must be at least 1".into(),
            ));
        }
        if c.run_timeout.is_zero() {
            return Err(ConvertError::InvalidConfig(
                "run timeout must be non-zero".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = BatchConfig::default();
        assert_eq!(c.concurrency, 2);
        assert_eq!(c.poll_interval, Duration::from_secs(3));
        assert_eq!(c.max_polls, 600);
        assert_eq!(c.run_timeout, Duration::from_secs(86_400));
    }

    #[test]
    fn concurrency_is_clamped_to_one() {
        let c = BatchConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn zero_poll_budget_is_rejected() {
        let err = BatchConfig::builder().max_polls(0).build().unwrap_err();
        assert!(err.to_string().contains("poll budget"));
    }

    #[test]
    fn shortened_budget_for_tests_is_allowed() {
        let c = BatchConfig::builder()
            .poll_interval(Duration::ZERO)
            .max_polls(5)
            .build()
            .unwrap();
        assert_eq!(c.max_polls, 5);
        assert!(c.poll_interval.is_zero());
    }
}
