//! The chunk: unit of scheduling.
//!
//! A chunk is one time-bounded fragment of a stream's query. It moves by
//! value through the stage queues, so exactly one worker owns it at any
//! moment and its fields need no locking.
//!
//! Invariants maintained by the mutators below:
//! - the query handle is set when the chunk reaches `Started` and kept after;
//! - the error is set exactly when the state is `Failed`;
//! - terminal states are never left.

mod range;
mod state;

pub use range::{RangeError, TimeRange};
pub use state::{ChunkState, TransitionError};

use crate::client::{QueryHandle, ResultRow};
use crate::error::ChunkError;
use crate::stream::{StreamId, StreamRef};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Identity of a chunk: owning stream plus position within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId {
    stream: StreamId,
    ordinal: usize,
}

impl ChunkId {
    /// Owning stream.
    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// Position of the chunk within its stream.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stream, self.ordinal)
    }
}

/// A time-bounded query fragment and its lifecycle.
#[derive(Debug)]
pub struct Chunk {
    id: ChunkId,
    stream: StreamRef,
    range: TimeRange,
    state: ChunkState,
    handle: Option<QueryHandle>,
    error: Option<ChunkError>,
    rows: Option<Vec<ResultRow>>,
    cancellation: CancellationToken,
    attempts: u32,
}

impl Chunk {
    /// Creates a pending chunk whose cancellation follows its stream.
    pub fn new(stream: StreamRef, ordinal: usize, range: TimeRange) -> Self {
        Self {
            id: ChunkId {
                stream: stream.id(),
                ordinal,
            },
            cancellation: stream.child_token(),
            stream,
            range,
            state: ChunkState::Pending,
            handle: None,
            error: None,
            rows: None,
            attempts: 0,
        }
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    pub fn stream(&self) -> &StreamRef {
        &self.stream
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Remote query handle, once submitted.
    pub fn handle(&self) -> Option<&QueryHandle> {
        self.handle.as_ref()
    }

    /// Terminal error, if the chunk failed.
    pub fn error(&self) -> Option<&ChunkError> {
        self.error.as_ref()
    }

    /// Result rows, if the query completed.
    pub fn rows(&self) -> Option<&[ResultRow]> {
        self.rows.as_deref()
    }

    /// Moves the result rows out of the chunk.
    pub fn take_rows(&mut self) -> Option<Vec<ResultRow>> {
        self.rows.take()
    }

    /// Token cancelled when the owning stream dies.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Remote call attempts made on this chunk across all stages.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns true while the owning stream is alive.
    pub fn is_alive(&self) -> bool {
        self.stream.alive()
    }

    /// Records a successful submission.
    pub fn mark_started(&mut self, handle: QueryHandle) -> Result<(), TransitionError> {
        self.advance(ChunkState::Started)?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Records that a poll found the query not yet ready.
    pub fn mark_polling(&mut self) -> Result<(), TransitionError> {
        if self.state == ChunkState::Polling {
            return Ok(());
        }
        self.advance(ChunkState::Polling)
    }

    /// Records completion along with the query's rows.
    pub fn mark_succeeded(&mut self, rows: Vec<ResultRow>) -> Result<(), TransitionError> {
        self.advance(ChunkState::Succeeded)?;
        self.rows = Some(rows);
        Ok(())
    }

    /// Moves the chunk to `Failed` with `error`.
    ///
    /// Returns false, leaving the chunk untouched, if it is already terminal.
    pub fn fail(&mut self, error: ChunkError) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = ChunkState::Failed;
        self.error = Some(error);
        true
    }

    /// Moves the chunk to `Discarded`.
    ///
    /// Returns false, leaving the chunk untouched, if it is already terminal.
    pub fn discard(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = ChunkState::Discarded;
        true
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    fn advance(&mut self, next: ChunkState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
