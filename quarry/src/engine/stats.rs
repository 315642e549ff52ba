//! Per-stage counters.
//!
//! Updated by every worker of a stage without locking and read through a
//! [`StageStatsSnapshot`] for logging and tests.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for one stage.
#[derive(Debug, Default)]
pub struct StageStats {
    /// Remote call attempts made
    attempts: AtomicU64,
    /// Attempts that ended in a transient failure
    retries: AtomicU64,
    /// Chunks handed back to the stage input as not ready
    requeued: AtomicU64,
    /// Chunks forwarded to the stage output
    completed: AtomicU64,
    /// Chunks discarded (stream death or shutdown)
    discarded: AtomicU64,
    /// Chunks that used up their attempt budget
    exhausted: AtomicU64,
}

/// Snapshot of [`StageStats`] at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStatsSnapshot {
    pub attempts: u64,
    pub retries: u64,
    pub requeued: u64,
    pub completed: u64,
    pub discarded: u64,
    pub exhausted: u64,
}

impl StageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_requeue(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads all counters.
    pub fn snapshot(&self) -> StageStatsSnapshot {
        StageStatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for StageStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempts={} retries={} requeued={} completed={} discarded={} exhausted={}",
            self.attempts,
            self.retries,
            self.requeued,
            self.completed,
            self.discarded,
            self.exhausted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_stats_are_zero() {
        assert_eq!(StageStats::new().snapshot(), StageStatsSnapshot::default());
    }

    #[test]
    fn test_concurrent_updates() {
        let stats = Arc::new(StageStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_attempt();
                        stats.record_retry();
                    }
                    stats.record_completed();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.attempts, 400);
        assert_eq!(snapshot.retries, 400);
        assert_eq!(snapshot.completed, 4);
        assert_eq!(snapshot.discarded, 0);
    }

    #[test]
    fn test_snapshot_display() {
        let stats = StageStats::new();
        stats.record_requeue();
        stats.record_discard();
        stats.record_exhausted();
        let text = stats.snapshot().to_string();
        assert!(text.contains("requeued=1"));
        assert!(text.contains("discarded=1"));
        assert!(text.contains("exhausted=1"));
    }
}
