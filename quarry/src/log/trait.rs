//! Logger trait definition.

use crate::chunk::ChunkId;
use std::fmt;

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One diagnostic event about a chunk.
///
/// `tag` is a short stage-specific label such as `"transient"` or
/// `"giving up"`; `detail` carries the free-form message.
#[derive(Debug, Clone, Copy)]
pub struct ChunkEvent<'a> {
    pub chunk: ChunkId,
    pub tag: &'a str,
    pub detail: fmt::Arguments<'a>,
}

/// Sink for per-chunk diagnostics.
///
/// Implementations must be `Send + Sync` since every worker of every stage
/// shares one logger. Logging never fails.
pub trait Logger: Send + Sync {
    /// Records an event at the given level.
    fn log(&self, level: LogLevel, event: ChunkEvent<'_>);

    /// Short name of the sink.
    fn name(&self) -> &'static str;

    fn trace(&self, chunk: ChunkId, tag: &str, detail: fmt::Arguments<'_>) {
        self.log(LogLevel::Trace, ChunkEvent { chunk, tag, detail });
    }

    fn debug(&self, chunk: ChunkId, tag: &str, detail: fmt::Arguments<'_>) {
        self.log(LogLevel::Debug, ChunkEvent { chunk, tag, detail });
    }

    fn info(&self, chunk: ChunkId, tag: &str, detail: fmt::Arguments<'_>) {
        self.log(LogLevel::Info, ChunkEvent { chunk, tag, detail });
    }

    fn warn(&self, chunk: ChunkId, tag: &str, detail: fmt::Arguments<'_>) {
        self.log(LogLevel::Warn, ChunkEvent { chunk, tag, detail });
    }

    fn error(&self, chunk: ChunkId, tag: &str, detail: fmt::Arguments<'_>) {
        self.log(LogLevel::Error, ChunkEvent { chunk, tag, detail });
    }
}

/// Logs a chunk event with a format string.
///
/// ```ignore
/// log_chunk!(self.logger, warn, chunk.id(), "transient", "{}", err);
/// ```
#[macro_export]
macro_rules! log_chunk {
    ($logger:expr, $level:ident, $chunk:expr, $tag:expr, $($arg:tt)*) => {
        $logger.$level($chunk, $tag, format_args!($($arg)*))
    };
}
