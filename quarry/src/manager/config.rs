//! Coordinator configuration.

use std::time::Duration;

use crate::config::{
    ConfigFile, DEFAULT_CANCEL_RPS, DEFAULT_CANCEL_WORKERS, DEFAULT_MAX_TRY,
    DEFAULT_NOT_READY_DELAY_MS, DEFAULT_POLL_RPS, DEFAULT_POLL_WORKERS, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS, DEFAULT_SUBMIT_RPS,
    DEFAULT_SUBMIT_WORKERS,
};
use crate::engine::StageConfig;
use crate::regulator::RateCategory;

/// Tuning of one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSettings {
    /// Requests per second for the stage's call type.
    pub rps: f64,
    /// Concurrent workers.
    pub workers: usize,
    /// Attempts per chunk before giving up.
    pub max_try: u32,
}

impl StageSettings {
    pub fn new(rps: f64, workers: usize, max_try: u32) -> Self {
        Self {
            rps,
            workers,
            max_try,
        }
    }
}

/// Everything [`QueryManager::start`](super::QueryManager::start) needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    pub submit: StageSettings,
    pub poll: StageSettings,
    pub cancel: StageSettings,
    /// Delay before a running query is polled again.
    pub not_ready_delay: Duration,
    /// Backoff after the first transient failure; doubles per retry.
    pub retry_base_delay: Duration,
    /// Cap on retry backoff.
    pub retry_max_delay: Duration,
    /// Capacity of every inter-stage queue; 0 means unbounded.
    pub queue_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            submit: StageSettings::new(DEFAULT_SUBMIT_RPS, DEFAULT_SUBMIT_WORKERS, DEFAULT_MAX_TRY),
            poll: StageSettings::new(DEFAULT_POLL_RPS, DEFAULT_POLL_WORKERS, DEFAULT_MAX_TRY),
            cancel: StageSettings::new(DEFAULT_CANCEL_RPS, DEFAULT_CANCEL_WORKERS, DEFAULT_MAX_TRY),
            not_ready_delay: Duration::from_millis(DEFAULT_NOT_READY_DELAY_MS),
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            retry_max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ManagerConfig {
    pub fn with_submit(mut self, settings: StageSettings) -> Self {
        self.submit = settings;
        self
    }

    pub fn with_poll(mut self, settings: StageSettings) -> Self {
        self.poll = settings;
        self
    }

    pub fn with_cancel(mut self, settings: StageSettings) -> Self {
        self.cancel = settings;
        self
    }

    pub fn with_not_ready_delay(mut self, delay: Duration) -> Self {
        self.not_ready_delay = delay;
        self
    }

    pub fn with_retry_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.retry_base_delay = base;
        self.retry_max_delay = max;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Settings of the stage gated by `category`.
    pub fn stage(&self, category: RateCategory) -> StageSettings {
        match category {
            RateCategory::Submit => self.submit,
            RateCategory::Poll => self.poll,
            RateCategory::Cancel => self.cancel,
        }
    }

    /// Engine configuration of the stage gated by `category`.
    pub(crate) fn stage_config(&self, category: RateCategory) -> StageConfig {
        let settings = self.stage(category);
        StageConfig::new(category.as_str(), category)
            .with_workers(settings.workers)
            .with_max_try(settings.max_try)
            .with_not_ready_delay(self.not_ready_delay)
            .with_retry_backoff(self.retry_base_delay, self.retry_max_delay)
            .with_require_live_stream(category != RateCategory::Cancel)
    }
}

impl From<&ConfigFile> for ManagerConfig {
    fn from(file: &ConfigFile) -> Self {
        Self {
            submit: StageSettings::new(file.rate.submit, file.workers.submit, file.retry.submit),
            poll: StageSettings::new(file.rate.poll, file.workers.poll, file.retry.poll),
            cancel: StageSettings::new(file.rate.cancel, file.workers.cancel, file.retry.cancel),
            not_ready_delay: Duration::from_millis(file.poll.not_ready_delay_ms),
            retry_base_delay: Duration::from_millis(file.retry.backoff_base_ms),
            retry_max_delay: Duration::from_millis(file.retry.backoff_max_ms),
            queue_capacity: file.queue.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_config_file_default() {
        assert_eq!(ManagerConfig::default(), ManagerConfig::from(&ConfigFile::default()));
    }

    #[test]
    fn test_from_config_file() {
        let mut file = ConfigFile::default();
        file.rate.poll = 0.5;
        file.workers.cancel = 1;
        file.retry.submit = 2;
        file.poll.not_ready_delay_ms = 250;
        file.queue.capacity = 16;

        let config = ManagerConfig::from(&file);
        assert_eq!(config.poll.rps, 0.5);
        assert_eq!(config.cancel.workers, 1);
        assert_eq!(config.submit.max_try, 2);
        assert_eq!(config.not_ready_delay, Duration::from_millis(250));
        assert_eq!(config.queue_capacity, 16);
    }

    #[test]
    fn test_stage_configs() {
        let config = ManagerConfig::default().with_poll(StageSettings::new(2.0, 3, 7));

        let poll = config.stage_config(RateCategory::Poll);
        assert_eq!(poll.name, "poll");
        assert_eq!(poll.workers, 3);
        assert_eq!(poll.max_try, 7);
        assert!(poll.require_live_stream);

        let cancel = config.stage_config(RateCategory::Cancel);
        assert_eq!(cancel.name, "cancel");
        assert!(!cancel.require_live_stream);
    }
}
