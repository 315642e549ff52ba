//! Remote log-search service interface.
//!
//! The engine never talks to a concrete service. Stages depend on the
//! [`QueryClient`] trait, and the client is responsible for classifying each
//! failure as transient (retry later) or permanent before it reaches a
//! manipulator.

use std::fmt;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Opaque identifier the remote service assigns to a started query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryHandle(String);

impl QueryHandle {
    /// Wraps a service-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters of a query submission.
///
/// Bounds are inclusive epoch seconds, the service's native representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub text: String,
    pub start_secs: i64,
    pub end_secs: i64,
    pub groups: Vec<String>,
    pub limit: u32,
}

/// Response to a query submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitResponse {
    /// Handle of the started query. A well-behaved service always sets it.
    pub handle: Option<QueryHandle>,
}

/// Status of a remote query as reported by a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    Scheduled,
    Running,
    Complete,
    Failed,
    Cancelled,
    Timeout,
    Unknown,
}

impl QueryStatus {
    /// Returns true while the query may still produce results.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Scheduled | Self::Running)
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scheduled => "Scheduled",
            Self::Running => "Running",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
            Self::Timeout => "Timeout",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// One field of a result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultField {
    pub field: String,
    pub value: String,
}

/// One result row, as returned by the service.
pub type ResultRow = Vec<ResultField>;

/// Response to a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    pub status: QueryStatus,
    /// Rows, present once the query is complete.
    pub rows: Option<Vec<ResultRow>>,
}

/// Classified failure from the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    /// Human-readable error message.
    pub message: String,
    /// Whether retrying later may succeed (throttling, unavailability).
    pub is_transient: bool,
}

impl ClientError {
    /// Creates a transient error (throttling, timeouts, 5xx).
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_transient: true,
        }
    }

    /// Creates a permanent error (validation failures, unknown groups).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_transient: false,
        }
    }

    /// Error reported when a call is abandoned because its scope was cancelled.
    pub fn aborted() -> Self {
        Self::permanent("call aborted: cancellation scope closed")
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ClientError {}

/// Remote log-search service.
///
/// Each method performs exactly one remote call. Implementations should
/// honour `scope`, but callers also race every call against it, so a
/// client that ignores cancellation is still aborted promptly.
pub trait QueryClient: Send + Sync + 'static {
    /// Starts a query.
    fn submit(
        &self,
        request: SubmitRequest,
        scope: &CancellationToken,
    ) -> impl Future<Output = Result<SubmitResponse, ClientError>> + Send;

    /// Fetches status and, once complete, rows of a started query.
    fn poll(
        &self,
        handle: &QueryHandle,
        scope: &CancellationToken,
    ) -> impl Future<Output = Result<PollResponse, ClientError>> + Send;

    /// Stops a started query.
    fn cancel(
        &self,
        handle: &QueryHandle,
        scope: &CancellationToken,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Returns the client name for logging.
    fn name(&self) -> &str;
}

/// Runs a remote call, abandoning it if `scope` is cancelled first.
pub async fn scoped<T, F>(scope: &CancellationToken, call: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        biased;
        _ = scope.cancelled() => Err(ClientError::aborted()),
        result = call => result,
    }
}
