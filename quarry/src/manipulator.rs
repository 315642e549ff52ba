//! Stage strategy trait.
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 StageEngine<M>                   │
//! │  queue ─▶ liveness ─▶ regulator ─▶ M::attempt    │
//! │                                      │           │
//! │           Done ─▶ output   NotReady ─▶ requeue   │
//! │           Retry ─▶ next attempt, or give up      │
//! └──────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!         Submitter │ Poller │ Canceller
//! ```
//!
//! The engine knows nothing about remote calls. A [`Manipulator`] performs
//! one call per attempt, classifies the result, and records any progress
//! or permanent failure on the chunk before answering with an [`Outcome`].

use crate::chunk::Chunk;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// What the engine should do after one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Leave the retry loop and forward the chunk.
    Done,
    /// Transient failure; try again if budget remains.
    Retry,
    /// The remote operation is still in progress. Hand the chunk back to
    /// this stage's input after the stage delay, without spending budget.
    NotReady,
}

/// Stage-specific operation the engine applies to each chunk.
pub trait Manipulator: Send + Sync + 'static {
    /// Stage name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Cancellation scope for the next remote call on `chunk`.
    fn context(&self, chunk: &Chunk) -> CancellationToken;

    /// Performs exactly one remote call and classifies the result.
    fn attempt(
        &self,
        chunk: &mut Chunk,
        scope: &CancellationToken,
    ) -> impl Future<Output = Outcome> + Send;

    /// Called when the engine gives up on or discards `chunk`.
    ///
    /// Takes `&Chunk`: releasing may log but never changes the chunk.
    fn release(&self, chunk: &Chunk);
}
