//! Worker engine: bounded-concurrency, rate-gated stage execution.
//!
//! One [`StageEngine`] per stage. Stages are connected only through
//! `async_channel` queues described by a [`StageWiring`]:
//!
//! ```text
//! submit ──▶ poll ──▶ finished
//!   │  ▲       │ ▲
//!   │  └retry  │ └ not ready (after delay)
//!   └──────────┴──▶ cancel (discarded chunks that hold a handle)
//! ```

mod config;
mod stage;
mod stats;

pub use config::{StageConfig, DEFAULT_STAGE_WORKERS};
pub use stage::{StageEngine, StageHandle, StageWiring};
pub use stats::{StageStats, StageStatsSnapshot};
