//! Tracing library adapter implementation.

use crate::log::{ChunkEvent, LogLevel, Logger};

/// Logger that emits each chunk event as a `tracing` event.
///
/// The chunk id and tag become structured fields, so a subscriber can
/// filter on them. Assumes a subscriber is installed (see
/// [`crate::logging::init_logging`]); otherwise events are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, event: ChunkEvent<'_>) {
        let chunk = event.chunk;
        let tag = event.tag;
        let detail = event.detail;
        match level {
            LogLevel::Trace => tracing::trace!(chunk = %chunk, tag, "{}", detail),
            LogLevel::Debug => tracing::debug!(chunk = %chunk, tag, "{}", detail),
            LogLevel::Info => tracing::info!(chunk = %chunk, tag, "{}", detail),
            LogLevel::Warn => tracing::warn!(chunk = %chunk, tag, "{}", detail),
            LogLevel::Error => tracing::error!(chunk = %chunk, tag, "{}", detail),
        }
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}
