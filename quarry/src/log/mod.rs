//! Per-chunk diagnostic logging.
//!
//! Stages report what happens to each chunk (retries, give-ups, discards)
//! through the [`Logger`] trait rather than calling `tracing` directly, so
//! the sink can be swapped or silenced without touching stage code.
//!
//! - `Logger`: the interface stages and engines log through
//! - `TracingLogger`: production adapter, emits `tracing` events with
//!   `chunk` and `tag` fields
//! - `NoOpLogger`: discards everything, for tests and benchmarks
//!
//! ```
//! use quarry::log::{Logger, NoOpLogger};
//! use std::sync::Arc;
//!
//! let logger: Arc<dyn Logger> = Arc::new(NoOpLogger);
//! assert_eq!(logger.name(), "noop");
//! ```

mod noop;
mod tracing_adapter;
mod r#trait;

pub use noop::NoOpLogger;
pub use r#trait::{ChunkEvent, LogLevel, Logger};
pub use tracing_adapter::TracingLogger;
