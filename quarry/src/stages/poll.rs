//! Polling stage.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::chunk::Chunk;
use crate::client::{scoped, QueryClient, QueryStatus};
use crate::error::ChunkError;
use crate::log::{Logger, NoOpLogger};
use crate::log_chunk;
use crate::manipulator::{Manipulator, Outcome};

/// Polls started queries until they complete.
///
/// A query that is still scheduled or running answers
/// [`Outcome::NotReady`], which puts the chunk back on the poll queue after
/// the stage delay without spending its retry budget.
pub struct Poller<C: QueryClient> {
    client: Arc<C>,
    logger: Arc<dyn Logger>,
}

impl<C: QueryClient> Poller<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            logger: Arc::new(NoOpLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }
}

impl<C: QueryClient> Manipulator for Poller<C> {
    fn name(&self) -> &'static str {
        "poll"
    }

    fn context(&self, chunk: &Chunk) -> CancellationToken {
        chunk.cancellation().clone()
    }

    async fn attempt(&self, chunk: &mut Chunk, scope: &CancellationToken) -> Outcome {
        if !chunk.is_alive() {
            return Outcome::Done;
        }

        let Some(handle) = chunk.handle().cloned() else {
            let err = ChunkError::MissingHandle {
                text: chunk.stream().spec().text.clone(),
                range: chunk.range(),
            };
            chunk.fail(err);
            return Outcome::Done;
        };

        let result = scoped(scope, self.client.poll(&handle, scope)).await;

        match result {
            Err(_) if scope.is_cancelled() => Outcome::Done,
            Err(e) if e.is_transient => {
                log_chunk!(self.logger, warn, chunk.id(), "transient", "poll of {} failed: {}", handle, e);
                Outcome::Retry
            }
            Err(cause) => {
                let err = ChunkError::Poll {
                    handle,
                    text: chunk.stream().spec().text.clone(),
                    range: chunk.range(),
                    cause,
                };
                chunk.fail(err);
                Outcome::Done
            }
            Ok(response) if response.status.is_pending() => {
                if let Err(e) = chunk.mark_polling() {
                    chunk.fail(e.into());
                    return Outcome::Done;
                }
                log_chunk!(self.logger, trace, chunk.id(), "not ready", "query {} is {}", handle, response.status);
                Outcome::NotReady
            }
            Ok(response) if response.status == QueryStatus::Complete => {
                let rows = response.rows.unwrap_or_default();
                log_chunk!(self.logger, debug, chunk.id(), "complete", "query {} returned {} rows", handle, rows.len());
                if let Err(e) = chunk.mark_succeeded(rows) {
                    chunk.fail(e.into());
                }
                Outcome::Done
            }
            Ok(response) => {
                let err = ChunkError::Terminated {
                    handle,
                    range: chunk.range(),
                    status: response.status,
                };
                chunk.fail(err);
                Outcome::Done
            }
        }
    }

    fn release(&self, chunk: &Chunk) {
        log_chunk!(
            self.logger,
            debug,
            chunk.id(),
            "releasing pollable",
            "state {} after {} attempts",
            chunk.state(),
            chunk.attempts()
        );
    }
}
