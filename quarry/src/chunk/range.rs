//! Half-open time ranges covered by a chunk.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use thiserror::Error;

/// Errors from constructing a [`TimeRange`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// End is not strictly after start.
    #[error("time range end {end} is not after start {start}")]
    Empty {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Epoch seconds outside the representable calendar range.
    #[error("epoch timestamp {0} is out of range")]
    OutOfRange(i64),
}

/// A half-open `[start, end)` interval of wall-clock time.
///
/// The remote service works with inclusive, one-second-granularity bounds,
/// so [`TimeRange::inclusive_epoch_secs`] converts by dropping one second
/// from the exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, RangeError> {
        if end <= start {
            return Err(RangeError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a range from whole epoch seconds.
    pub fn from_epoch_secs(start: i64, end: i64) -> Result<Self, RangeError> {
        let start_at = DateTime::from_timestamp(start, 0).ok_or(RangeError::OutOfRange(start))?;
        let end_at = DateTime::from_timestamp(end, 0).ok_or(RangeError::OutOfRange(end))?;
        Self::new(start_at, end_at)
    }

    /// Inclusive start of the range.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end of the range.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the range.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns `(start, end)` as inclusive epoch seconds.
    ///
    /// `[100, 160)` becomes `(100, 159)`.
    pub fn inclusive_epoch_secs(&self) -> (i64, i64) {
        let last = self.end - Duration::seconds(1);
        (self.start.timestamp(), last.timestamp())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}
