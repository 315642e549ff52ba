//! Chunk lifecycle state machine.
//!
//! ```text
//! Pending ──▶ Started ──▶ Polling ──▶ Succeeded
//!    │           │           │
//!    └───────────┴───────────┴──▶ Failed | Discarded
//! ```
//!
//! `Succeeded`, `Failed` and `Discarded` are terminal and are never left.

use std::fmt;
use thiserror::Error;

/// Externally visible lifecycle state of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Created, not yet submitted.
    Pending,
    /// Submitted; the remote query handle is known.
    Started,
    /// Polled at least once and found not ready.
    Polling,
    /// Query completed and its rows were collected.
    Succeeded,
    /// Permanent failure or retry budget exhausted.
    Failed,
    /// Dropped because the owning stream died or the process shut down.
    Discarded,
}

impl ChunkState {
    /// Returns true for states that are never left.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Discarded)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ChunkState) -> bool {
        use ChunkState::*;

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Pending, Started)
                | (Started, Polling)
                | (Started, Succeeded)
                | (Polling, Succeeded)
                | (_, Failed)
                | (_, Discarded)
        )
    }

    /// Short lowercase name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Polling => "polling",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Discarded => "discarded",
        }
    }
}

impl fmt::Display for ChunkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An attempted transition the state machine does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal chunk transition {from} -> {to}")]
pub struct TransitionError {
    pub from: ChunkState,
    pub to: ChunkState,
}
