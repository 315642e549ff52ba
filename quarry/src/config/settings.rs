//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Requests-per-second ceilings per operation category
    pub rate: RateSettings,
    /// Worker counts per stage
    pub workers: WorkerSettings,
    /// Retry budgets and backoff
    pub retry: RetrySettings,
    /// Poll stage pacing
    pub poll: PollSettings,
    /// Inter-stage queues
    pub queue: QueueSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// `[rate]`: requests per second the remote service allows per category.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSettings {
    pub submit: f64,
    pub poll: f64,
    pub cancel: f64,
}

/// `[workers]`: concurrent workers per stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub submit: usize,
    pub poll: usize,
    pub cancel: usize,
}

/// `[retry]`: attempt budgets per stage and the backoff between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySettings {
    pub submit: u32,
    pub poll: u32,
    pub cancel: u32,
    /// Base delay before the second attempt; doubles with each retry.
    pub backoff_base_ms: u64,
    /// Upper bound on the backoff delay.
    pub backoff_max_ms: u64,
}

/// `[poll]`: pacing of not-yet-ready queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay before a not-ready chunk is polled again.
    pub not_ready_delay_ms: u64,
}

/// `[queue]`: inter-stage channel sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    /// Channel capacity; 0 means unbounded.
    pub capacity: usize,
}

/// `[logging]`: where and how verbosely to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
    /// Filter used when RUST_LOG is unset, e.g. `info` or `quarry=debug`.
    pub level: String,
}
