//! Run configuration, fixed before the first probe starts

use crate::proxy::checker::{CheckerConfig, SuccessCriterion};
use crate::proxy::pool::DEFAULT_CONCURRENCY;
use reqwest::Url;
use std::time::Duration;

/// Default number of working proxies to collect per class
pub const DEFAULT_QUOTA: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("proxy count must be at least 1")]
    ZeroQuota,
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid validation target {url}: {reason}")]
    InvalidTarget { url: String, reason: String },
}

/// Configuration shared read-only by every worker of a run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum number of probes in flight
    pub concurrency: usize,
    /// Working proxies to collect before stopping
    pub quota: usize,
    /// Hide the progress bar
    pub silent: bool,
    pub checker: CheckerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            quota: DEFAULT_QUOTA,
            silent: false,
            checker: CheckerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = quota;
        self
    }

    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.checker.timeout = timeout;
        self
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.checker.test_url = url;
        self
    }

    pub fn with_criterion(mut self, criterion: SuccessCriterion) -> Self {
        self.checker.criterion = criterion;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.quota == 0 {
            return Err(ConfigError::ZeroQuota);
        }
        if self.checker.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let invalid = |reason: String| ConfigError::InvalidTarget {
            url: self.checker.test_url.clone(),
            reason,
        };
        let url = Url::parse(&self.checker.test_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }

        Ok(())
    }
}
