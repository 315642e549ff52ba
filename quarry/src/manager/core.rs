//! The query manager: owns queues, regulators, streams and stages.

use async_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::config::ManagerConfig;
use crate::chunk::{Chunk, TimeRange};
use crate::client::QueryClient;
use crate::engine::{StageEngine, StageHandle, StageStats, StageStatsSnapshot, StageWiring};
use crate::log::{Logger, TracingLogger};
use crate::regulator::{RateCategory, Regulator, RegulatorError, RegulatorSet};
use crate::stages::{Canceller, Poller, Submitter};
use crate::stream::{StreamId, StreamRegistry, StreamSpec};

/// Coordinator errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManagerError {
    #[error(transparent)]
    InvalidRate(#[from] RegulatorError),

    #[error("query manager is shut down")]
    ShutDown,

    #[error("a stream needs at least one time range")]
    NoChunks,
}

/// Counters of all three stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub submit: StageStatsSnapshot,
    pub poll: StageStatsSnapshot,
    pub cancel: StageStatsSnapshot,
}

impl ManagerStats {
    fn set(&mut self, stage: &str, snapshot: StageStatsSnapshot) {
        match stage {
            "submit" => self.submit = snapshot,
            "poll" => self.poll = snapshot,
            _ => self.cancel = snapshot,
        }
    }
}

fn channel<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    if capacity == 0 {
        async_channel::unbounded()
    } else {
        async_channel::bounded(capacity)
    }
}

/// Runs streams of chunked queries through submit, poll and cancel.
///
/// ```text
/// open_stream ─▶ [submit] ──started──▶ [poll] ──▶ next_finished
///                   │ failed ──────────────────▶ next_finished
///                   └──── closed stream, handle held ──▶ [cancel]
/// ```
///
/// Must be started inside a Tokio runtime. Dropping the manager signals
/// shutdown; [`QueryManager::shutdown`] also waits for the workers.
/// After shutdown every stream operation fails with
/// [`ManagerError::ShutDown`].
pub struct QueryManager {
    config: ManagerConfig,
    registry: StreamRegistry,
    regulators: RegulatorSet,
    shutdown: CancellationToken,
    submit_tx: Sender<Chunk>,
    finished_rx: Receiver<Chunk>,
    stages: Mutex<Vec<StageHandle>>,
    counters: [(&'static str, Arc<StageStats>); 3],
}

impl QueryManager {
    /// Starts all stages with a [`TracingLogger`].
    pub fn start<C: QueryClient>(client: Arc<C>, config: ManagerConfig) -> Result<Self, ManagerError> {
        Self::start_with_logger(client, config, Arc::new(TracingLogger::new()))
    }

    /// Starts all stages, reporting chunk events to `logger`.
    pub fn start_with_logger<C: QueryClient>(
        client: Arc<C>,
        config: ManagerConfig,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, ManagerError> {
        let shutdown = CancellationToken::new();
        let regulators = RegulatorSet::new(
            config.submit.rps,
            config.poll.rps,
            config.cancel.rps,
            &shutdown,
        )?;

        let (submit_tx, submit_rx) = channel(config.queue_capacity);
        let (poll_tx, poll_rx) = channel(config.queue_capacity);
        let (cancel_tx, cancel_rx) = channel(config.queue_capacity);
        let (finished_tx, finished_rx) = channel(config.queue_capacity);

        let submitter = Submitter::new(Arc::clone(&client)).with_logger(Arc::clone(&logger));
        let submit = StageEngine::new(
            config.stage_config(RateCategory::Submit),
            Arc::new(submitter),
            Arc::clone(&regulators.submit),
            shutdown.clone(),
        )
        .with_logger(Arc::clone(&logger));
        let submit_wiring = StageWiring::new(submit_rx, submit_tx.clone())
            .with_output(poll_tx.clone())
            .with_failure_sink(finished_tx.clone())
            .with_discard_sink(cancel_tx.clone());

        let poller = Poller::new(Arc::clone(&client)).with_logger(Arc::clone(&logger));
        let poll = StageEngine::new(
            config.stage_config(RateCategory::Poll),
            Arc::new(poller),
            Arc::clone(&regulators.poll),
            shutdown.clone(),
        )
        .with_logger(Arc::clone(&logger));
        let poll_wiring = StageWiring::new(poll_rx, poll_tx)
            .with_output(finished_tx)
            .with_discard_sink(cancel_tx.clone());

        let canceller = Canceller::new(client, shutdown.clone()).with_logger(Arc::clone(&logger));
        let cancel = StageEngine::new(
            config.stage_config(RateCategory::Cancel),
            Arc::new(canceller),
            Arc::clone(&regulators.cancel),
            shutdown.clone(),
        )
        .with_logger(logger);
        let cancel_wiring = StageWiring::new(cancel_rx, cancel_tx);

        let counters = [
            ("submit", Arc::clone(submit.stats())),
            ("poll", Arc::clone(poll.stats())),
            ("cancel", Arc::clone(cancel.stats())),
        ];
        let stages = vec![
            Arc::new(submit).spawn(submit_wiring),
            Arc::new(poll).spawn(poll_wiring),
            Arc::new(cancel).spawn(cancel_wiring),
        ];

        info!(
            version = crate::version(),
            submit_rps = config.submit.rps,
            poll_rps = config.poll.rps,
            cancel_rps = config.cancel.rps,
            queue_capacity = config.queue_capacity,
            "query manager started"
        );

        Ok(Self {
            config,
            registry: StreamRegistry::new(shutdown.clone()),
            regulators,
            shutdown,
            submit_tx,
            finished_rx,
            stages: Mutex::new(stages),
            counters,
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Registers a stream and queues one chunk per range, in order.
    ///
    /// Waits for queue space when the submit queue is bounded.
    pub async fn open_stream(
        &self,
        spec: StreamSpec,
        ranges: Vec<TimeRange>,
    ) -> Result<StreamId, ManagerError> {
        if self.shutdown.is_cancelled() {
            return Err(ManagerError::ShutDown);
        }
        if ranges.is_empty() {
            return Err(ManagerError::NoChunks);
        }

        let stream = self.registry.open(spec);
        let id = stream.id();
        let count = ranges.len();
        for (ordinal, range) in ranges.into_iter().enumerate() {
            let chunk = Chunk::new(stream.clone(), ordinal, range);
            let sent = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => false,
                sent = self.submit_tx.send(chunk) => sent.is_ok(),
            };
            if !sent {
                self.registry.close(id);
                return Err(ManagerError::ShutDown);
            }
        }

        debug!(stream = %id, chunks = count, "stream opened");
        Ok(id)
    }

    /// Closes a stream.
    ///
    /// Its in-flight calls are aborted, its queued chunks are discarded, and
    /// remote queries it already started are cancelled. Returns false if
    /// the stream was not open.
    pub fn close_stream(&self, id: StreamId) -> bool {
        let closed = self.registry.close(id);
        if closed {
            debug!(stream = %id, "stream closed");
        }
        closed
    }

    /// Returns true while the stream is open.
    pub fn is_open(&self, id: StreamId) -> bool {
        self.registry.alive(id)
    }

    /// Number of open streams.
    pub fn open_streams(&self) -> usize {
        self.registry.len()
    }

    /// Waits for the next chunk that succeeded or failed.
    ///
    /// Returns `None` once the manager is shut down and nothing is left.
    pub async fn next_finished(&self) -> Option<Chunk> {
        tokio::select! {
            biased;
            received = self.finished_rx.recv() => received.ok(),
            _ = self.shutdown.cancelled() => self.finished_rx.try_recv().ok(),
        }
    }

    /// Returns the next finished chunk if one is ready.
    pub fn try_next_finished(&self) -> Option<Chunk> {
        self.finished_rx.try_recv().ok()
    }

    /// Regulator of one call type.
    pub fn regulator(&self, category: RateCategory) -> &Arc<Regulator> {
        self.regulators.get(category)
    }

    /// Counters of all three stages.
    pub fn stats(&self) -> ManagerStats {
        let mut stats = ManagerStats::default();
        for (name, counters) in &self.counters {
            stats.set(name, counters.snapshot());
        }
        stats
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stops all stages and waits for their workers.
    ///
    /// Rate waits and in-flight calls are abandoned; queued chunks are
    /// dropped without being reported. Calling it again is a no-op.
    pub async fn shutdown(&self) -> ManagerStats {
        self.shutdown.cancel();
        let stages = self
            .stages
            .lock()
            .map(|mut stages| std::mem::take(&mut *stages))
            .unwrap_or_default();
        if stages.is_empty() {
            return self.stats();
        }

        for stage in stages {
            stage.join().await;
        }
        let stats = self.stats();
        info!(
            submitted = stats.submit.completed,
            polled = stats.poll.completed,
            cancelled = stats.cancel.completed,
            "query manager stopped"
        );
        stats
    }
}

impl Drop for QueryManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
