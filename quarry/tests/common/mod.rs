//! Shared helpers for integration tests.

#![allow(dead_code)]

use quarry::client::{
    ClientError, PollResponse, QueryClient, QueryHandle, QueryStatus, ResultField, SubmitRequest,
    SubmitResponse,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// In-memory log-search service driven by scripted responses.
///
/// Empty scripts fall back to success: submissions get handles `q-1`,
/// `q-2`, ..., polls report the default status, cancels succeed.
pub struct ScriptedClient {
    submits: Mutex<VecDeque<Result<SubmitResponse, ClientError>>>,
    polls: Mutex<VecDeque<Result<PollResponse, ClientError>>>,
    default_status: Mutex<QueryStatus>,
    submitted: Mutex<Vec<(SubmitRequest, Instant)>>,
    polled: Mutex<Vec<QueryHandle>>,
    cancelled: Mutex<Vec<QueryHandle>>,
    next_handle: AtomicU32,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            submits: Mutex::new(VecDeque::new()),
            polls: Mutex::new(VecDeque::new()),
            default_status: Mutex::new(QueryStatus::Complete),
            submitted: Mutex::new(Vec::new()),
            polled: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            next_handle: AtomicU32::new(1),
        }
    }

    pub fn script_submit(&self, response: Result<SubmitResponse, ClientError>) {
        self.submits.lock().unwrap().push_back(response);
    }

    pub fn script_poll(&self, response: Result<PollResponse, ClientError>) {
        self.polls.lock().unwrap().push_back(response);
    }

    /// Status reported once the poll script is used up.
    pub fn set_default_status(&self, status: QueryStatus) {
        *self.default_status.lock().unwrap() = status;
    }

    pub fn submitted(&self) -> Vec<SubmitRequest> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|(request, _)| request.clone())
            .collect()
    }

    pub fn submit_times(&self) -> Vec<Instant> {
        self.submitted.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub fn submit_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn poll_count(&self) -> usize {
        self.polled.lock().unwrap().len()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled
            .lock()
            .unwrap()
            .iter()
            .map(|h| h.as_str().to_string())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.submit_count() + self.poll_count() + self.cancelled.lock().unwrap().len()
    }
}

impl QueryClient for ScriptedClient {
    async fn submit(
        &self,
        request: SubmitRequest,
        _scope: &CancellationToken,
    ) -> Result<SubmitResponse, ClientError> {
        self.submitted.lock().unwrap().push((request, Instant::now()));
        let scripted = self.submits.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            let n = self.next_handle.fetch_add(1, Ordering::SeqCst);
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
        self.polled.lock().unwrap().push(handle.clone());
        let scripted = self.polls.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            let status = *self.default_status.lock().unwrap();
            let rows = (status == QueryStatus::Complete).then(|| {
                vec![vec![ResultField {
                    field: "@message".to_string(),
                    value: format!("row of {handle}"),
                }]]
            });
            Ok(PollResponse { status, rows })
        })
    }

    async fn cancel(
        &self,
        handle: &QueryHandle,
        _scope: &CancellationToken,
    ) -> Result<(), ClientError> {
        self.cancelled.lock().unwrap().push(handle.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Polls `condition` until it holds or `timeout` passes.
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Convenience for scripted poll responses without rows.
pub fn status(status: QueryStatus) -> Result<PollResponse, ClientError> {
    Ok(PollResponse { status, rows: None })
}
