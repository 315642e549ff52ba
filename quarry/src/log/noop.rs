//! No-operation logger implementation.

use crate::log::{ChunkEvent, LogLevel, Logger};

/// A logger that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    #[inline]
    fn log(&self, _level: LogLevel, _event: ChunkEvent<'_>) {}

    fn name(&self) -> &'static str {
        "noop"
    }
}
