//! Default values and constants for all configuration settings.

use std::path::PathBuf;

use super::settings::*;
use crate::logging::{DEFAULT_LOG_DIR, DEFAULT_LOG_FILE};

// =============================================================================
// Rate ceilings (requests per second)
// =============================================================================

/// Default ceiling for query submissions.
pub const DEFAULT_SUBMIT_RPS: f64 = 5.0;

/// Default ceiling for status polls.
pub const DEFAULT_POLL_RPS: f64 = 5.0;

/// Default ceiling for query cancellations.
pub const DEFAULT_CANCEL_RPS: f64 = 5.0;

// =============================================================================
// Workers
// =============================================================================

pub const DEFAULT_SUBMIT_WORKERS: usize = 4;
pub const DEFAULT_POLL_WORKERS: usize = 8;
pub const DEFAULT_CANCEL_WORKERS: usize = 2;

// =============================================================================
// Retry
// =============================================================================

/// Default attempt budget for every stage.
pub const DEFAULT_MAX_TRY: u32 = 10;

/// Default base backoff between transient failures.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 100;

/// Default cap on backoff between transient failures.
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;

// =============================================================================
// Poll pacing and queues
// =============================================================================

/// Default delay before a not-ready query is polled again.
pub const DEFAULT_NOT_READY_DELAY_MS: u64 = 1_000;

/// Default queue capacity (unbounded).
pub const DEFAULT_QUEUE_CAPACITY: usize = 0;

/// Default log filter when RUST_LOG is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            submit: DEFAULT_SUBMIT_RPS,
            poll: DEFAULT_POLL_RPS,
            cancel: DEFAULT_CANCEL_RPS,
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            submit: DEFAULT_SUBMIT_WORKERS,
            poll: DEFAULT_POLL_WORKERS,
            cancel: DEFAULT_CANCEL_WORKERS,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            submit: DEFAULT_MAX_TRY,
            poll: DEFAULT_MAX_TRY,
            cancel: DEFAULT_MAX_TRY,
            backoff_base_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            backoff_max_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            not_ready_delay_ms: DEFAULT_NOT_READY_DELAY_MS,
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            file: DEFAULT_LOG_FILE.to_string(),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}
