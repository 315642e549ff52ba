//! Terminal chunk errors.
//!
//! These are attached to a chunk when it reaches [`ChunkState::Failed`] and
//! are the only way failures surface to the caller. Transient remote errors
//! never appear here; they are retried and, once the budget is spent,
//! replaced by [`ChunkError::RetriesExhausted`].
//!
//! [`ChunkState::Failed`]: crate::chunk::ChunkState::Failed

use crate::chunk::{TimeRange, TransitionError};
use crate::client::{ClientError, QueryHandle, QueryStatus};
use thiserror::Error;

/// Message used when a submission succeeds without a query handle.
pub const MISSING_HANDLE_MSG: &str = "service returned no query handle";

/// Why a chunk failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// The service permanently rejected the submission.
    #[error("failed to start query {text:?} over {range}: {cause}")]
    Start {
        text: String,
        range: TimeRange,
        cause: ClientError,
    },

    /// Submission succeeded but no handle came back.
    #[error("failed to start query {text:?} over {range}: service returned no query handle")]
    MissingHandle { text: String, range: TimeRange },

    /// The service permanently rejected a poll.
    #[error("failed to poll query {handle} ({text:?} over {range}): {cause}")]
    Poll {
        handle: QueryHandle,
        text: String,
        range: TimeRange,
        cause: ClientError,
    },

    /// The query ended without completing.
    #[error("query {handle} over {range} ended with status {status}")]
    Terminated {
        handle: QueryHandle,
        range: TimeRange,
        status: QueryStatus,
    },

    /// Every allowed attempt hit a transient failure.
    #[error("gave up after {attempts} attempts in {stage} stage")]
    RetriesExhausted { stage: String, attempts: u32 },

    /// A manipulator asked for a state change the lifecycle forbids.
    #[error("internal error: {0}")]
    Transition(#[from] TransitionError),
}

impl ChunkError {
    /// Returns true if the engine gave up rather than the service refusing.
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}
