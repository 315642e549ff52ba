//! Per-category request-rate regulation.
//!
//! The remote service enforces a requests-per-second ceiling per call
//! type. A [`Regulator`] serializes one category's callers and grants them
//! slots no closer together than `1 / ceiling`, measured from the previous
//! grant. There is no burst credit: an idle regulator grants immediately,
//! but never more than one slot per interval.
//!
//! The async mutex is held across the interval wait, so waiters queue up
//! behind it in FIFO order and the spacing holds across every worker of
//! every stage that shares the regulator. Shutdown releases all waiters
//! with [`Slot::Aborted`].

use crate::config::{DEFAULT_CANCEL_RPS, DEFAULT_POLL_RPS, DEFAULT_SUBMIT_RPS};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Operation category, each with its own ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateCategory {
    Submit,
    Poll,
    Cancel,
}

impl RateCategory {
    /// All categories.
    pub const ALL: [RateCategory; 3] = [Self::Submit, Self::Poll, Self::Cancel];

    /// Ceiling used when the category is unconfigured.
    pub fn default_rps(self) -> f64 {
        match self {
            Self::Submit => DEFAULT_SUBMIT_RPS,
            Self::Poll => DEFAULT_POLL_RPS,
            Self::Cancel => DEFAULT_CANCEL_RPS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Poll => "poll",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for RateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`Regulator::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The caller may make one remote call; carries the slot instant.
    Granted(Instant),
    /// Shutdown fired before a slot became available.
    Aborted,
}

impl Slot {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Regulator construction errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegulatorError {
    #[error("invalid {category} rate ceiling {rps}: must be a finite number above zero")]
    InvalidCeiling { category: RateCategory, rps: f64 },
}

/// Throttle for one operation category.
#[derive(Debug)]
pub struct Regulator {
    category: RateCategory,
    rps: f64,
    min_interval: Duration,
    last_slot: Mutex<Option<Instant>>,
    /// Wall-clock ms since the UNIX epoch of the last remote call, 0 if none.
    last_call_ms: AtomicU64,
    shutdown: CancellationToken,
}

impl Regulator {
    /// Creates a regulator allowing `rps` requests per second.
    pub fn new(
        category: RateCategory,
        rps: f64,
        shutdown: CancellationToken,
    ) -> Result<Self, RegulatorError> {
        let invalid = RegulatorError::InvalidCeiling { category, rps };
        if !rps.is_finite() || rps <= 0.0 {
            return Err(invalid);
        }
        let min_interval = Duration::try_from_secs_f64(1.0 / rps).map_err(|_| invalid)?;

        Ok(Self {
            category,
            rps,
            min_interval,
            last_slot: Mutex::new(None),
            last_call_ms: AtomicU64::new(0),
            shutdown,
        })
    }

    /// Creates a regulator, falling back to the category default if unset.
    pub fn with_default(
        category: RateCategory,
        rps: Option<f64>,
        shutdown: CancellationToken,
    ) -> Result<Self, RegulatorError> {
        Self::new(category, rps.unwrap_or(category.default_rps()), shutdown)
    }

    pub fn category(&self) -> RateCategory {
        self.category
    }

    /// Configured ceiling in requests per second.
    pub fn rps(&self) -> f64 {
        self.rps
    }

    /// Minimum spacing between two grants.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits for the next slot.
    ///
    /// Returns [`Slot::Aborted`] as soon as shutdown fires, whether the
    /// caller is queued behind other waiters or sleeping out the interval.
    pub async fn acquire(&self) -> Slot {
        if self.shutdown.is_cancelled() {
            return Slot::Aborted;
        }

        let mut last = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Slot::Aborted,
            guard = self.last_slot.lock() => guard,
        };

        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Slot::Aborted,
                _ = tokio::time::sleep_until(ready_at) => {}
            }
        }

        let now = Instant::now();
        *last = Some(now);
        Slot::Granted(now)
    }

    /// Records that a remote call just finished.
    ///
    /// Informational only; never influences gating.
    pub fn note_call(&self) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.last_call_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Wall-clock time of the last remote call, in ms since the UNIX epoch.
    pub fn last_call_ms(&self) -> Option<u64> {
        match self.last_call_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(ms),
        }
    }
}

/// One regulator per category.
#[derive(Debug, Clone)]
pub struct RegulatorSet {
    pub submit: Arc<Regulator>,
    pub poll: Arc<Regulator>,
    pub cancel: Arc<Regulator>,
}

impl RegulatorSet {
    /// Builds all three regulators, sharing one shutdown signal.
    pub fn new(
        submit_rps: f64,
        poll_rps: f64,
        cancel_rps: f64,
        shutdown: &CancellationToken,
    ) -> Result<Self, RegulatorError> {
        Ok(Self {
            submit: Arc::new(Regulator::new(
                RateCategory::Submit,
                submit_rps,
                shutdown.clone(),
            )?),
            poll: Arc::new(Regulator::new(RateCategory::Poll, poll_rps, shutdown.clone())?),
            cancel: Arc::new(Regulator::new(
                RateCategory::Cancel,
                cancel_rps,
                shutdown.clone(),
            )?),
        })
    }

    pub fn get(&self, category: RateCategory) -> &Arc<Regulator> {
        match category {
            RateCategory::Submit => &self.submit,
            RateCategory::Poll => &self.poll,
            RateCategory::Cancel => &self.cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_invalid_ceilings_rejected() {
        for rps in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e-300] {
            let result = Regulator::new(RateCategory::Poll, rps, CancellationToken::new());
            assert!(result.is_err(), "rps {rps} accepted");
        }
    }

    #[test]
    fn test_default_ceiling() {
        let regulator =
            Regulator::with_default(RateCategory::Cancel, None, CancellationToken::new()).unwrap();
        assert_eq!(regulator.rps(), DEFAULT_CANCEL_RPS);
        assert_eq!(regulator.min_interval(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_slot_is_immediate() {
        let regulator = Regulator::new(RateCategory::Submit, 1.0, CancellationToken::new()).unwrap();
        let before = Instant::now();
        let slot = regulator.acquire().await;
        assert_eq!(slot, Slot::Granted(before));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_slots_are_spaced() {
        let regulator = Regulator::new(RateCategory::Submit, 4.0, CancellationToken::new()).unwrap();

        let mut grants = Vec::new();
        for _ in 0..5 {
            match regulator.acquire().await {
                Slot::Granted(at) => grants.push(at),
                Slot::Aborted => panic!("unexpected abort"),
            }
        }

        for pair in grants.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(250));
        }
    }

    #[tokio::test]
    async fn test_shutdown_releases_waiter() {
        let shutdown = CancellationToken::new();
        // One request every 1000 seconds: the second acquire would block.
        let regulator = Arc::new(Regulator::new(RateCategory::Poll, 0.001, shutdown.clone()).unwrap());
        assert!(regulator.acquire().await.is_granted());

        let waiter = {
            let regulator = Arc::clone(&regulator);
            tokio::spawn(async move { regulator.acquire().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        let slot = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("waiter should be released")
            .unwrap();
        assert_eq!(slot, Slot::Aborted);
        assert_eq!(regulator.acquire().await, Slot::Aborted);
    }

    #[test]
    fn test_note_call_is_informational() {
        let regulator = Regulator::new(RateCategory::Submit, 5.0, CancellationToken::new()).unwrap();
        assert_eq!(regulator.last_call_ms(), None);
        regulator.note_call();
        assert!(regulator.last_call_ms().is_some_and(|ms| ms > 0));
    }

    #[test]
    fn test_regulator_set_routes_categories() {
        let set = RegulatorSet::new(1.0, 2.0, 4.0, &CancellationToken::new()).unwrap();
        for category in RateCategory::ALL {
            assert_eq!(set.get(category).category(), category);
        }
        assert_eq!(set.get(RateCategory::Poll).rps(), 2.0);
        assert!(RegulatorSet::new(1.0, 0.0, 1.0, &CancellationToken::new()).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Grants handed to concurrent workers never come closer together
        /// than the minimum interval.
        #[test]
        fn prop_concurrent_grants_are_spaced(workers in 1usize..8, rps in 1.0f64..50.0, per_worker in 1usize..4) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let mut grants = runtime.block_on(async move {
                let regulator = Arc::new(Regulator::new(RateCategory::Submit, rps, CancellationToken::new()).unwrap());
                let mut tasks = Vec::new();
                for _ in 0..workers {
                    let regulator = Arc::clone(&regulator);
                    tasks.push(tokio::spawn(async move {
                        let mut mine = Vec::new();
                        for _ in 0..per_worker {
                            if let Slot::Granted(at) = regulator.acquire().await {
                                mine.push(at);
                            }
                        }
                        mine
                    }));
                }
                let mut all = Vec::new();
                for task in tasks {
                    all.extend(task.await.unwrap());
                }
                (all, regulator.min_interval())
            });

            let interval = grants.1;
            grants.0.sort();
            prop_assert_eq!(grants.0.len(), workers * per_worker);
            for pair in grants.0.windows(2) {
                prop_assert!(pair[1] - pair[0] >= interval);
            }
        }
    }
}
