//! Submission stage.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::chunk::Chunk;
use crate::client::{scoped, QueryClient, SubmitRequest, SubmitResponse};
use crate::error::ChunkError;
use crate::log::{Logger, NoOpLogger};
use crate::log_chunk;
use crate::manipulator::{Manipulator, Outcome};

/// Starts the remote query for each pending chunk.
///
/// The chunk's `[start, end)` range is sent as inclusive whole seconds
/// `[start, end - 1s]`, so adjacent chunks never overlap on the service.
pub struct Submitter<C: QueryClient> {
    client: Arc<C>,
    logger: Arc<dyn Logger>,
}

impl<C: QueryClient> Submitter<C> {
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

    fn request(chunk: &Chunk) -> SubmitRequest {
        let spec = chunk.stream().spec();
        let (start_secs, end_secs) = chunk.range().inclusive_epoch_secs();
        SubmitRequest {
            text: spec.text.clone(),
            start_secs,
            end_secs,
            groups: spec.groups.clone(),
            limit: spec.limit,
        }
    }
}

impl<C: QueryClient> Manipulator for Submitter<C> {
    fn name(&self) -> &'static str {
        "submit"
    }

    fn context(&self, chunk: &Chunk) -> CancellationToken {
        chunk.cancellation().clone()
    }

    async fn attempt(&self, chunk: &mut Chunk, scope: &CancellationToken) -> Outcome {
        if !chunk.is_alive() {
            return Outcome::Done;
        }

        let request = Self::request(chunk);
        let result = scoped(scope, self.client.submit(request, scope)).await;

        let text = &chunk.stream().spec().text;
        match result {
            // Stream closed or shutting down; the engine discards the chunk.
            Err(_) if scope.is_cancelled() => Outcome::Done,
            Err(e) if e.is_transient => {
                log_chunk!(self.logger, warn, chunk.id(), "transient", "submit failed: {}", e);
                Outcome::Retry
            }
            Err(cause) => {
                let err = ChunkError::Start {
                    text: text.clone(),
                    range: chunk.range(),
                    cause,
                };
                chunk.fail(err);
                Outcome::Done
            }
            Ok(SubmitResponse { handle: None }) => {
                let err = ChunkError::MissingHandle {
                    text: text.clone(),
                    range: chunk.range(),
                };
                chunk.fail(err);
                Outcome::Done
            }
            Ok(SubmitResponse {
                handle: Some(handle),
            }) => {
                log_chunk!(self.logger, debug, chunk.id(), "started", "query {} over {}", handle, chunk.range());
                if let Err(e) = chunk.mark_started(handle) {
                    chunk.fail(e.into());
                }
                Outcome::Done
            }
        }
    }

    fn release(&self, chunk: &Chunk) {
        log_chunk!(
            self.logger,
            debug,
            chunk.id(),
            "releasing startable",
            "state {} after {} attempts",
            chunk.state(),
            chunk.attempts()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkState, TimeRange};
    use crate::client::{ClientError, QueryHandle};
    use crate::stages::mock::MockClient;
    use crate::stream::{StreamRegistry, StreamSpec};

    fn setup() -> (StreamRegistry, Chunk) {
        let registry = StreamRegistry::new(CancellationToken::new());
        let spec = StreamSpec::new("stats count(*) by bin(1m)", vec!["/app/api".into()]).with_limit(500);
        let stream = registry.open(spec);
        let chunk = Chunk::new(stream, 0, TimeRange::from_epoch_secs(100, 160).unwrap());
        (registry, chunk)
    }

    async fn run(submitter: &Submitter<MockClient>, chunk: &mut Chunk) -> Outcome {
        let scope = submitter.context(chunk);
        submitter.attempt(chunk, &scope).await
    }

    #[tokio::test]
    async fn test_success_records_handle() {
        let (_registry, mut chunk) = setup();
        let client = Arc::new(MockClient::default());
        let submitter = Submitter::new(Arc::clone(&client));

        assert_eq!(run(&submitter, &mut chunk).await, Outcome::Done);
        assert_eq!(chunk.state(), ChunkState::Started);
        assert_eq!(chunk.handle().map(QueryHandle::as_str), Some("q-1"));
    }

    #[tokio::test]
    async fn test_request_uses_inclusive_seconds() {
        let (_registry, mut chunk) = setup();
        let client = Arc::new(MockClient::default());
        let submitter = Submitter::new(Arc::clone(&client));

        run(&submitter, &mut chunk).await;

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].start_secs, 100);
        assert_eq!(requests[0].end_secs, 159);
        assert_eq!(requests[0].text, "stats count(*) by bin(1m)");
        assert_eq!(requests[0].groups, vec!["/app/api".to_string()]);
        assert_eq!(requests[0].limit, 500);
    }

    #[tokio::test]
    async fn test_transient_error_retries() {
        let (_registry, mut chunk) = setup();
        let client = Arc::new(MockClient::default());
        client
            .submits
            .lock()
            .unwrap()
            .push_back(Err(ClientError::transient("ThrottlingException")));
        let submitter = Submitter::new(Arc::clone(&client));

        assert_eq!(run(&submitter, &mut chunk).await, Outcome::Retry);
        assert_eq!(chunk.state(), ChunkState::Pending);
        assert!(chunk.error().is_none());
    }

    #[tokio::test]
    async fn test_permanent_error_fails_chunk() {
        let (_registry, mut chunk) = setup();
        let client = Arc::new(MockClient::default());
        client
            .submits
            .lock()
            .unwrap()
            .push_back(Err(ClientError::permanent("ResourceNotFoundException: no such group")));
        let submitter = Submitter::new(Arc::clone(&client));

        assert_eq!(run(&submitter, &mut chunk).await, Outcome::Done);
        assert_eq!(chunk.state(), ChunkState::Failed);
        let msg = chunk.error().unwrap().to_string();
        assert!(msg.contains("stats count(*) by bin(1m)"), "{msg}");
        assert!(msg.contains(&chunk.range().to_string()), "{msg}");
        assert!(msg.contains("ResourceNotFoundException"), "{msg}");
    }

    #[tokio::test]
    async fn test_missing_handle_fails_chunk() {
        let (_registry, mut chunk) = setup();
        let client = Arc::new(MockClient::default());
        client
            .submits
            .lock()
            .unwrap()
            .push_back(Ok(SubmitResponse { handle: None }));
        let submitter = Submitter::new(Arc::clone(&client));

        assert_eq!(run(&submitter, &mut chunk).await, Outcome::Done);
        assert_eq!(chunk.state(), ChunkState::Failed);
        assert!(matches!(chunk.error(), Some(ChunkError::MissingHandle { .. })));
        assert!(chunk.handle().is_none());
    }

    #[tokio::test]
    async fn test_dead_stream_makes_no_call() {
        let (registry, mut chunk) = setup();
        let client = Arc::new(MockClient::default());
        let submitter = Submitter::new(Arc::clone(&client));
        registry.close(chunk.id().stream());

        assert_eq!(run(&submitter, &mut chunk).await, Outcome::Done);
        assert_eq!(client.calls(), 0);
        assert_eq!(chunk.state(), ChunkState::Pending);
    }

    #[tokio::test]
    async fn test_release_does_not_mutate() {
        let (_registry, mut chunk) = setup();
        chunk.mark_started(QueryHandle::new("q-3")).unwrap();
        let submitter = Submitter::new(Arc::new(MockClient::default()));

        submitter.release(&chunk);

        assert_eq!(chunk.state(), ChunkState::Started);
        assert_eq!(chunk.handle().map(QueryHandle::as_str), Some("q-3"));
        assert!(chunk.error().is_none());
    }
}
