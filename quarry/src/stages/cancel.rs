//! Cancellation stage.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::chunk::Chunk;
use crate::client::{scoped, QueryClient};
use crate::log::{Logger, NoOpLogger};
use crate::log_chunk;
use crate::manipulator::{Manipulator, Outcome};

/// Stops remote queries whose stream is gone.
///
/// Chunks reach this stage already discarded, with their stream token
/// cancelled, so calls are scoped to process shutdown instead. Nothing is
/// recorded on the chunk: a failed cancel is logged and dropped.
pub struct Canceller<C: QueryClient> {
    client: Arc<C>,
    logger: Arc<dyn Logger>,
    shutdown: CancellationToken,
}

impl<C: QueryClient> Canceller<C> {
    pub fn new(client: Arc<C>, shutdown: CancellationToken) -> Self {
        Self {
            client,
            logger: Arc::new(NoOpLogger),
            shutdown,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }
}

impl<C: QueryClient> Manipulator for Canceller<C> {
    fn name(&self) -> &'static str {
        "cancel"
    }

    fn context(&self, _chunk: &Chunk) -> CancellationToken {
        self.shutdown.child_token()
    }

    async fn attempt(&self, chunk: &mut Chunk, scope: &CancellationToken) -> Outcome {
        let Some(handle) = chunk.handle() else {
            return Outcome::Done;
        };

        match scoped(scope, self.client.cancel(handle, scope)).await {
            Ok(()) => {
                log_chunk!(self.logger, debug, chunk.id(), "cancelled", "query {}", handle);
                Outcome::Done
            }
            Err(_) if scope.is_cancelled() => Outcome::Done,
            Err(e) if e.is_transient => {
                log_chunk!(self.logger, warn, chunk.id(), "transient", "cancel of {} failed: {}", handle, e);
                Outcome::Retry
            }
            Err(e) => {
                log_chunk!(self.logger, warn, chunk.id(), "cancel failed", "query {}: {}", handle, e);
                Outcome::Done
            }
        }
    }

    fn release(&self, chunk: &Chunk) {
        if let Some(handle) = chunk.handle() {
            log_chunk!(self.logger, warn, chunk.id(), "releasing cancellable", "query {} may still be running", handle);
        }
    }
}
