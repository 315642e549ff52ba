//! Per-stage engine configuration.

use std::time::Duration;

use crate::config::{
    DEFAULT_MAX_TRY, DEFAULT_NOT_READY_DELAY_MS, DEFAULT_RETRY_BASE_DELAY_MS,
    DEFAULT_RETRY_MAX_DELAY_MS,
};
use crate::regulator::RateCategory;

/// Default number of workers for a stage built with [`StageConfig::new`].
pub const DEFAULT_STAGE_WORKERS: usize = 4;

/// Configuration of one stage engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    /// Stage name, used in logs and in `RetriesExhausted` errors.
    pub name: &'static str,

    /// Concurrent workers draining the stage input.
    ///
    /// Default: 4
    pub workers: usize,

    /// Attempts per chunk before giving up. At least 1.
    ///
    /// Default: 10
    pub max_try: u32,

    /// Regulator category gating every attempt.
    pub category: RateCategory,

    /// Delay before a not-ready chunk re-enters the stage.
    ///
    /// Default: 1 second
    pub not_ready_delay: Duration,

    /// Backoff before the second attempt; doubles with each retry.
    ///
    /// Default: 100 ms
    pub retry_base_delay: Duration,

    /// Upper bound on retry backoff.
    ///
    /// Default: 5 seconds
    pub retry_max_delay: Duration,

    /// Whether chunks of dead streams are discarded before and after each
    /// attempt. True for submit and poll, false for cancel.
    pub require_live_stream: bool,
}

impl StageConfig {
    /// Creates a configuration with default tuning.
    pub fn new(name: &'static str, category: RateCategory) -> Self {
        Self {
            name,
            workers: DEFAULT_STAGE_WORKERS,
            max_try: DEFAULT_MAX_TRY,
            category,
            not_ready_delay: Duration::from_millis(DEFAULT_NOT_READY_DELAY_MS),
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            retry_max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            require_live_stream: true,
        }
    }

    /// Sets the worker count (minimum 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets the attempt budget (minimum 1).
    pub fn with_max_try(mut self, max_try: u32) -> Self {
        self.max_try = max_try.max(1);
        self
    }

    pub fn with_not_ready_delay(mut self, delay: Duration) -> Self {
        self.not_ready_delay = delay;
        self
    }

    /// Sets the retry backoff base and cap.
    pub fn with_retry_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max.max(base);
        self
    }

    pub fn with_require_live_stream(mut self, require: bool) -> Self {
        self.require_live_stream = require;
        self
    }

    /// Backoff to wait after the `retry`-th transient failure (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        self.retry_base_delay
            .saturating_mul(1u32 << shift)
            .min(self.retry_max_delay)
    }
}
