//! The generic stage engine.
//!
//! A [`StageEngine`] owns one [`Manipulator`] and runs `workers` tasks that
//! drain a shared input queue. Every attempt is gated on the stage's
//! regulator, so the rate ceiling holds no matter how many workers run.
//! Chunks move by value: whichever worker receives one owns it until it is
//! sent on or dropped.

use async_channel::{Receiver, Sender};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::StageConfig;
use super::stats::{StageStats, StageStatsSnapshot};
use crate::chunk::{Chunk, ChunkState};
use crate::error::ChunkError;
use crate::log::{Logger, NoOpLogger};
use crate::log_chunk;
use crate::manipulator::{Manipulator, Outcome};
use crate::regulator::{Regulator, Slot};

/// Queues a stage reads from and writes to.
#[derive(Debug, Clone)]
pub struct StageWiring {
    /// Chunks to process.
    pub input: Receiver<Chunk>,
    /// Sender side of `input`, used to hand back not-ready chunks.
    pub requeue: Sender<Chunk>,
    /// Where finished chunks go. `None` drops them.
    pub output: Option<Sender<Chunk>>,
    /// Where failed chunks go, if not to `output`.
    pub failure_sink: Option<Sender<Chunk>>,
    /// Where discarded chunks holding a remote handle go (the cancel stage).
    pub discard_sink: Option<Sender<Chunk>>,
}

impl StageWiring {
    /// Wiring with an input queue and nothing downstream.
    pub fn new(input: Receiver<Chunk>, requeue: Sender<Chunk>) -> Self {
        Self {
            input,
            requeue,
            output: None,
            failure_sink: None,
            discard_sink: None,
        }
    }

    pub fn with_output(mut self, output: Sender<Chunk>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_failure_sink(mut self, sink: Sender<Chunk>) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    pub fn with_discard_sink(mut self, sink: Sender<Chunk>) -> Self {
        self.discard_sink = Some(sink);
        self
    }
}

/// Running workers of one stage.
#[derive(Debug)]
pub struct StageHandle {
    name: &'static str,
    tasks: Vec<JoinHandle<()>>,
    stats: Arc<StageStats>,
}

impl StageHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn stats(&self) -> StageStatsSnapshot {
        self.stats.snapshot()
    }

    /// Waits for every worker to stop and returns the final counters.
    ///
    /// Workers stop on shutdown or once the input queue is closed and empty.
    pub async fn join(self) -> StageStatsSnapshot {
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(stage = self.name, error = %e, "stage worker panicked");
            }
        }
        let stats = self.stats.snapshot();
        debug!(stage = self.name, %stats, "stage stopped");
        stats
    }
}

/// Runs one stage's manipulator over a queue of chunks.
pub struct StageEngine<M: Manipulator> {
    config: StageConfig,
    manipulator: Arc<M>,
    regulator: Arc<Regulator>,
    logger: Arc<dyn Logger>,
    shutdown: CancellationToken,
    stats: Arc<StageStats>,
}

impl<M: Manipulator> StageEngine<M> {
    /// Creates an engine. `regulator` gates every attempt of this stage.
    pub fn new(
        config: StageConfig,
        manipulator: Arc<M>,
        regulator: Arc<Regulator>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            manipulator,
            regulator,
            logger: Arc::new(NoOpLogger),
            shutdown,
            stats: Arc::new(StageStats::new()),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<StageStats> {
        &self.stats
    }

    pub fn manipulator(&self) -> &Arc<M> {
        &self.manipulator
    }

    /// Starts `config.workers` tasks draining `wiring.input`.
    pub fn spawn(self: Arc<Self>, wiring: StageWiring) -> StageHandle {
        let tasks = (0..self.config.workers)
            .map(|worker| {
                let engine = Arc::clone(&self);
                let wiring = wiring.clone();
                tokio::spawn(async move { engine.run_worker(worker, wiring).await })
            })
            .collect();

        debug!(
            stage = self.config.name,
            workers = self.config.workers,
            max_try = self.config.max_try,
            category = %self.config.category,
            "stage started"
        );

        StageHandle {
            name: self.config.name,
            tasks,
            stats: Arc::clone(&self.stats),
        }
    }

    async fn run_worker(&self, worker: usize, wiring: StageWiring) {
        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                received = wiring.input.recv() => match received {
                    Ok(chunk) => chunk,
                    Err(_) => break,
                },
            };
            self.process(chunk, &wiring).await;
        }
        debug!(stage = self.config.name, worker, "stage worker stopped");
    }

    /// Drives one chunk through this stage.
    ///
    /// On return the chunk has been forwarded, handed back to the input,
    /// sent to the discard sink, or dropped.
    pub async fn process(&self, mut chunk: Chunk, wiring: &StageWiring) {
        if self.stream_dead(&chunk) {
            self.discard(chunk, wiring).await;
            return;
        }

        let max_try = self.config.max_try;
        for attempt in 1..=max_try {
            if let Slot::Aborted = self.regulator.acquire().await {
                self.abandon(chunk);
                return;
            }

            if self.stream_dead(&chunk) {
                self.discard(chunk, wiring).await;
                return;
            }

            let scope = self.manipulator.context(&chunk);
            chunk.record_attempt();
            self.stats.record_attempt();
            let outcome = self.manipulator.attempt(&mut chunk, &scope).await;
            self.regulator.note_call();

            if self.stream_dead(&chunk) {
                self.discard(chunk, wiring).await;
                return;
            }

            match outcome {
                Outcome::Done => {
                    self.forward(chunk, wiring).await;
                    return;
                }
                Outcome::NotReady => {
                    self.requeue(chunk, wiring);
                    return;
                }
                Outcome::Retry => {
                    self.stats.record_retry();
                    if attempt == max_try {
                        break;
                    }
                    let backoff = self.config.backoff(attempt);
                    log_chunk!(
                        self.logger,
                        debug,
                        chunk.id(),
                        "retry",
                        "{} attempt {}/{} failed, retrying in {:?}",
                        self.config.name,
                        attempt,
                        max_try,
                        backoff
                    );
                    if !backoff.is_zero() {
                        tokio::select! {
                            biased;
                            _ = self.shutdown.cancelled() => {
                                self.abandon(chunk);
                                return;
                            }
                            _ = tokio::time::sleep(backoff) => {}
                        }
                    }
                }
            }
        }

        self.stats.record_exhausted();
        chunk.fail(ChunkError::RetriesExhausted {
            stage: self.config.name.to_string(),
            attempts: max_try,
        });
        self.manipulator.release(&chunk);
        self.forward(chunk, wiring).await;
    }

    fn stream_dead(&self, chunk: &Chunk) -> bool {
        self.config.require_live_stream && !chunk.is_alive()
    }

    /// Sends a finished chunk downstream.
    async fn forward(&self, chunk: Chunk, wiring: &StageWiring) {
        self.stats.record_completed();
        let target = match chunk.state() {
            ChunkState::Failed => wiring.failure_sink.as_ref().or(wiring.output.as_ref()),
            _ => wiring.output.as_ref(),
        };
        if let Some(tx) = target {
            let id = chunk.id();
            if !self.send(tx, chunk).await {
                debug!(stage = self.config.name, chunk = %id, "output closed, chunk dropped");
            }
        }
    }

    /// Hands a not-ready chunk back to the stage input after the pacing delay.
    fn requeue(&self, chunk: Chunk, wiring: &StageWiring) {
        self.stats.record_requeue();
        let delay = self.config.not_ready_delay;
        let tx = wiring.requeue.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => {}
                        _ = tx.send(chunk) => {}
                    }
                }
            }
        });
    }

    /// Discards a chunk whose stream died.
    ///
    /// A started query is handed to the discard sink so the remote side can
    /// be stopped, unless the process is shutting down.
    async fn discard(&self, mut chunk: Chunk, wiring: &StageWiring) {
        chunk.discard();
        self.stats.record_discard();
        self.manipulator.release(&chunk);

        let needs_cancel = chunk.state() == ChunkState::Discarded
            && chunk.handle().is_some()
            && !self.shutdown.is_cancelled();

        match wiring.discard_sink.as_ref() {
            Some(sink) if needs_cancel => {
                log_chunk!(self.logger, debug, chunk.id(), "discarded", "stream closed, cancelling remote query");
                self.send(sink, chunk).await;
            }
            _ => {
                log_chunk!(self.logger, debug, chunk.id(), "discarded", "stream closed");
            }
        }
    }

    /// Drops a chunk because the engine is shutting down.
    fn abandon(&self, mut chunk: Chunk) {
        chunk.discard();
        self.stats.record_discard();
        self.manipulator.release(&chunk);
        log_chunk!(self.logger, trace, chunk.id(), "discarded", "shutting down");
    }

    async fn send(&self, tx: &Sender<Chunk>, chunk: Chunk) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            sent = tx.send(chunk) => sent.is_ok(),
        }
    }
}
