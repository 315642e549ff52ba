//! Query streams and the liveness oracle chunks consult.
//!
//! A stream is one user query (text, log groups, row limit) split into many
//! chunks. The [`StreamRegistry`] holds the only strong reference to each
//! stream's state; chunks carry a [`StreamRef`], a weak back-reference that
//! answers "is my stream still alive?" without keeping the stream around.
//! Closing a stream cancels its token, which aborts in-flight remote calls
//! for every chunk derived from it, and makes all of its queued chunks
//! observe `alive() == false` without the registry having to find them.

use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;

/// Maximum rows the remote service returns for one query.
pub const MAX_ROW_LIMIT: u32 = 10_000;

/// Unique identifier of a stream within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

impl StreamId {
    /// Returns the numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// What a stream asks the remote service for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    /// Query text in the remote service's query language.
    pub text: String,
    /// Log groups the query runs against.
    pub groups: Vec<String>,
    /// Maximum rows per chunk.
    pub limit: u32,
}

impl StreamSpec {
    /// Creates a spec with the maximum row limit.
    pub fn new(text: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            text: text.into(),
            groups,
            limit: MAX_ROW_LIMIT,
        }
    }

    /// Sets the row limit, clamped to `1..=MAX_ROW_LIMIT`.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_ROW_LIMIT);
        self
    }
}

#[derive(Debug)]
struct StreamState {
    token: CancellationToken,
}

/// Weak back-reference from a chunk to its owning stream.
///
/// Cloning is cheap. Holding a `StreamRef` never keeps a closed stream
/// alive.
#[derive(Debug, Clone)]
pub struct StreamRef {
    id: StreamId,
    spec: Arc<StreamSpec>,
    state: Weak<StreamState>,
}

impl StreamRef {
    /// Returns the stream's identifier.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Returns the stream's query spec.
    pub fn spec(&self) -> &Arc<StreamSpec> {
        &self.spec
    }

    /// Returns true while the stream is registered and not cancelled.
    pub fn alive(&self) -> bool {
        self.state
            .upgrade()
            .is_some_and(|state| !state.token.is_cancelled())
    }

    /// Derives a cancellation token that fires when the stream dies.
    ///
    /// If the stream is already gone, the returned token is cancelled.
    pub fn child_token(&self) -> CancellationToken {
        match self.state.upgrade() {
            Some(state) => state.token.child_token(),
            None => {
                let token = CancellationToken::new();
                token.cancel();
                token
            }
        }
    }
}

/// Registry of live streams; the stream liveness oracle.
#[derive(Debug)]
pub struct StreamRegistry {
    streams: DashMap<StreamId, Arc<StreamState>>,
    next_id: AtomicU64,
    root: CancellationToken,
}

impl StreamRegistry {
    /// Creates a registry whose streams all die when `root` is cancelled.
    pub fn new(root: CancellationToken) -> Self {
        Self {
            streams: DashMap::new(),
            next_id: AtomicU64::new(1),
            root,
        }
    }

    /// Registers a new stream and returns a reference to it.
    pub fn open(&self, spec: StreamSpec) -> StreamRef {
        let id = StreamId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let state = Arc::new(StreamState {
            token: self.root.child_token(),
        });
        let stream = StreamRef {
            id,
            spec: Arc::new(spec),
            state: Arc::downgrade(&state),
        };
        self.streams.insert(id, state);
        stream
    }

    /// Closes a stream, aborting its in-flight calls.
    ///
    /// Returns false if the stream was not registered.
    pub fn close(&self, id: StreamId) -> bool {
        match self.streams.remove(&id) {
            Some((_, state)) => {
                state.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Returns true if the stream is registered and not cancelled.
    pub fn alive(&self, id: StreamId) -> bool {
        self.streams
            .get(&id)
            .is_some_and(|state| !state.token.is_cancelled())
    }

    /// Number of registered streams.
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Returns true if no streams are registered.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
