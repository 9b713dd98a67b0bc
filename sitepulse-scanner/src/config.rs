use crate::error::{Result, ScanError};
use std::num::NonZeroUsize;
use std::time::Duration;

pub const DEFAULT_MAX_WORKERS: usize = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Settings for a health-check run. Validated once by the builder and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerConfig {
    max_workers: usize,
    timeout: Duration,
    sampling_rate: f64,
    batch_size: Option<NonZeroUsize>,
}

impl CheckerConfig {
    pub fn builder() -> CheckerConfigBuilder {
        CheckerConfigBuilder::default()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size.map(NonZeroUsize::get)
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sampling_rate: 1.0,
            batch_size: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckerConfigBuilder {
    max_workers: usize,
    timeout: Duration,
    sampling_rate: f64,
    batch_size: usize,
}

impl Default for CheckerConfigBuilder {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sampling_rate: 1.0,
            batch_size: 0,
        }
    }
}

impl CheckerConfigBuilder {
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_secs(self, secs: u64) -> Self {
        self.timeout(Duration::from_secs(secs))
    }

    pub fn sampling_rate(mut self, rate: f64) -> Self {
        self.sampling_rate = rate;
        self
    }

    /// 0 means no batch limit.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn build(self) -> Result<CheckerConfig> {
        if self.max_workers == 0 {
            return Err(ScanError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if !(self.sampling_rate > 0.0 && self.sampling_rate <= 1.0) {
            return Err(ScanError::InvalidConfig(format!(
                "sampling_rate must be in (0.0, 1.0], got {}",
                self.sampling_rate
            )));
        }

        Ok(CheckerConfig {
            max_workers: self.max_workers,
            timeout: self.timeout,
            sampling_rate: self.sampling_rate,
            batch_size: NonZeroUsize::new(self.batch_size),
        })
    }
}

/// Settings for sitemap discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub max_depth: usize,
    pub fetch_timeout: Duration,
    pub recursive: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            recursive: true,
        }
    }
}
