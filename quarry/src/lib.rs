//! quarry - chunked, rate-limited execution of log-search queries
//!
//! Large time-ranged searches against a remote, rate-limited log-search
//! service are split into chunks, and each chunk is driven through
//! submit → poll → (cancel) under per-call-type request-rate ceilings,
//! with bounded retry of transient failures.
//!
//! # High-Level API
//!
//! ```ignore
//! use quarry::manager::{ManagerConfig, QueryManager};
//! use quarry::stream::StreamSpec;
//!
//! let manager = QueryManager::start(client, ManagerConfig::default())?;
//! let id = manager
//!     .open_stream(StreamSpec::new("fields @message", groups), ranges)
//!     .await?;
//! while let Some(chunk) = manager.next_finished().await {
//!     // chunk.state() is Succeeded or Failed
//! }
//! ```
//!
//! The building blocks are public for custom pipelines: [`regulator`],
//! [`manipulator`], [`engine`] and [`stages`].

pub mod chunk;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod logging;
pub mod manager;
pub mod manipulator;
pub mod regulator;
pub mod stages;
pub mod stream;

pub use chunk::{Chunk, ChunkId, ChunkState, TimeRange};
pub use client::{ClientError, QueryClient, QueryHandle};
pub use error::ChunkError;
pub use manager::{ManagerConfig, ManagerError, QueryManager};
pub use manipulator::{Manipulator, Outcome};
pub use stream::{StreamId, StreamSpec};

/// Version of the quarry library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifies this engine to remote services, e.g. as a user-agent suffix.
pub fn version() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_identifies_crate() {
        assert!(version().starts_with("quarry/"));
        assert!(version().ends_with(VERSION));
        assert!(!VERSION.is_empty());
    }
}
