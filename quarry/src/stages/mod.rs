//! The three stage manipulators.
//!
//! - [`Submitter`]: starts the remote query for a pending chunk
//! - [`Poller`]: polls a started query until it completes or fails
//! - [`Canceller`]: stops the remote query of a chunk whose stream died
//!
//! Each wraps a shared [`QueryClient`](crate::client::QueryClient) and does
//! the transient/permanent classification the engine relies on.

mod cancel;
mod poll;
mod submit;

pub use cancel::Canceller;
pub use poll::Poller;
pub use submit::Submitter;

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted in-memory client for stage tests.

    use crate::client::{
        ClientError, PollResponse, QueryClient, QueryHandle, QueryStatus, SubmitRequest,
        SubmitResponse,
    };
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    /// Replays queued responses; falls back to success when a queue is empty.
    #[derive(Default)]
    pub struct MockClient {
        pub submits: Mutex<VecDeque<Result<SubmitResponse, ClientError>>>,
        pub polls: Mutex<VecDeque<Result<PollResponse, ClientError>>>,
        pub cancels: Mutex<VecDeque<Result<(), ClientError>>>,
        pub requests: Mutex<Vec<SubmitRequest>>,
        pub polled: Mutex<Vec<QueryHandle>>,
        pub cancelled: Mutex<Vec<QueryHandle>>,
        pub calls: AtomicU32,
    }

    impl MockClient {
        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl QueryClient for MockClient {
        async fn submit(
            &self,
            request: SubmitRequest,
            _scope: &CancellationToken,
        ) -> Result<SubmitResponse, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.requests.lock().unwrap().push(request);
            self.submits.lock().unwrap().pop_front().unwrap_or_else(|| {
                Ok(SubmitResponse {
                    handle: Some(QueryHandle::new(format!("q-{n}"))),
                })
            })
        }

        async fn poll(
            &self,
            handle: &QueryHandle,
            _scope: &CancellationToken,
        ) -> Result<PollResponse, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.polled.lock().unwrap().push(handle.clone());
            self.polls.lock().unwrap().pop_front().unwrap_or(Ok(PollResponse {
                status: QueryStatus::Complete,
                rows: Some(Vec::new()),
            }))
        }

        async fn cancel(
            &self,
            handle: &QueryHandle,
            _scope: &CancellationToken,
        ) -> Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.cancelled.lock().unwrap().push(handle.clone());
            self.cancels.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        fn name(&self) -> &str {
            "mock"
        }
    }
}
