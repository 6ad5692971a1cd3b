//! The generation coordinator.
//!
//! A single task owns the current [`RunState`]. Handles and spawned producer
//! tasks talk to it through one command queue, so every state change is
//! applied in order by one writer. Snapshots go out through a `watch`
//! channel and progress events through a `broadcast` channel.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use super::config::GenerationConfig;
use super::events::GenerationEvent;
use super::handle::GenerationHandle;
use super::messages::{ChunkResult, Command};
use super::run::RunState;
use super::traits::{ChunkProducer, OutlineProducer, OutlineResult};
use super::types::{
    Caller, ChunkFailure, GenerationError, GenerationPhase, OutlineFailure, PersistenceStatus,
    ProgressSnapshot, RetryError, RunId,
};
use crate::metrics;
use crate::persistence::{PersistReceipt, PersistenceError, PersistenceSink};
use crate::planner::{ChunkPlanner, DayRange};
use crate::trip::{Itinerary, TripPreferences};

/// Owns run state and drives producers and the persistence sink.
///
/// Create with [`GenerationCoordinator::new`] and spawn [`run`](Self::run).
pub struct GenerationCoordinator {
    config: GenerationConfig,
    planner: ChunkPlanner,
    outline_producer: Arc<dyn OutlineProducer>,
    chunk_producer: Arc<dyn ChunkProducer>,
    sink: Arc<dyn PersistenceSink>,
    rx: mpsc::Receiver<Command>,
    /// Weak so the loop ends once every handle and in-flight task is gone.
    tx: mpsc::WeakSender<Command>,
    progress_tx: watch::Sender<ProgressSnapshot>,
    events_tx: broadcast::Sender<GenerationEvent>,
    run: Option<RunState>,
    /// Chunks held back until the lead chunk settles.
    deferred: Vec<DayRange>,
    lead_chunk: Option<DayRange>,
}

impl GenerationCoordinator {
    /// Create a coordinator and the handle that talks to it.
    ///
    /// Returns:
    /// - `GenerationHandle` - clone this to share across tasks
    /// - `GenerationCoordinator` - spawn with `tokio::spawn(coordinator.run())`
    pub fn new(
        config: GenerationConfig,
        outline_producer: Arc<dyn OutlineProducer>,
        chunk_producer: Arc<dyn ChunkProducer>,
        sink: Arc<dyn PersistenceSink>,
    ) -> (GenerationHandle, GenerationCoordinator) {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let (progress_tx, progress_rx) = watch::channel(ProgressSnapshot::default());
        let (events_tx, _) = broadcast::channel(config.event_buffer.max(1));

        let handle = GenerationHandle::new(tx.clone(), progress_rx, events_tx.clone());
        let coordinator = GenerationCoordinator {
            planner: config.planner(),
            config,
            outline_producer,
            chunk_producer,
            sink,
            rx,
            tx: tx.downgrade(),
            progress_tx,
            events_tx,
            run: None,
            deferred: Vec::new(),
            lead_chunk: None,
        };
        (handle, coordinator)
    }

    /// Process commands until shutdown or until every sender is dropped.
    pub async fn run(mut self) {
        info!(
            "Generation coordinator started (outline: {}, chunks: {}, max_chunk_days: {})",
            self.outline_producer.name(),
            self.chunk_producer.name(),
            self.planner.max_chunk_days()
        );

        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Start {
                    preferences,
                    caller,
                    reply,
                } => {
                    let run_id = self.start_run(preferences, caller);
                    let _ = reply.send(run_id);
                }
                Command::Retry { range, reply } => {
                    let result = self.retry(range);
                    let _ = reply.send(result);
                }
                Command::RetryFailed { reply } => {
                    let result = self.retry_failed();
                    let _ = reply.send(result);
                }
                Command::RetryPersistence { reply } => {
                    let result = self.retry_persistence();
                    let _ = reply.send(result);
                }
                Command::GetItinerary { reply } => {
                    let itinerary = self.run.as_ref().and_then(|r| r.itinerary().cloned());
                    let _ = reply.send(itinerary);
                }
                Command::OutlineFinished { run_id, result } => {
                    self.on_outline_finished(run_id, result);
                }
                Command::ChunkFinished(result) => {
                    self.on_chunk_finished(result);
                }
                Command::PersistFinished { run_id, result } => {
                    self.on_persist_finished(run_id, result);
                }
                Command::Shutdown => {
                    info!("Generation coordinator received shutdown");
                    break;
                }
            }
        }

        info!("Generation coordinator stopped");
    }

    // ------------------------------------------------------------------------
    // Run lifecycle
    // ------------------------------------------------------------------------

    fn start_run(&mut self, preferences: TripPreferences, caller: Caller) -> RunId {
        let run_id = RunId::new();

        if let Some(previous) = self.run.take() {
            if previous.phase().is_generating() {
                info!("Abandoning run {} for new run {}", previous.run_id(), run_id);
                metrics::RUNS_FINISHED.with_label_values(&["abandoned"]).inc();
            }
        }
        self.deferred.clear();
        self.lead_chunk = None;

        let preferences = preferences.prepared();
        info!(
            run_id = %run_id,
            destination = preferences.destination_label().as_deref().unwrap_or("undecided"),
            days = preferences.duration.days(),
            authenticated = caller.is_authenticated(),
            "Starting generation run"
        );

        self.run = Some(RunState::new(run_id.clone(), preferences.clone(), caller));
        metrics::RUNS_STARTED.inc();
        self.publish();
        self.emit(GenerationEvent::RunStarted {
            run_id: run_id.clone(),
        });

        let days = preferences.duration.days();
        if !self.planner.admits(days) {
            let failure = OutlineFailure::invalid_input(format!(
                "trip of {} days exceeds the {}-day limit",
                days,
                self.planner.max_trip_days()
            ));
            if let Some(run) = self.run.as_mut() {
                run.apply_outline_failure(failure.clone());
            }
            self.report_outline_failure(run_id.clone(), failure);
            return run_id;
        }

        self.spawn_outline(run_id.clone(), preferences);
        run_id
    }

    fn spawn_outline(&self, run_id: RunId, preferences: TripPreferences) {
        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let producer = Arc::clone(&self.outline_producer);
        let timeout = self.config.outline_timeout();

        tokio::spawn(async move {
            // A panic in the producer surfaces here as a JoinError.
            let mut job =
                tokio::spawn(async move { producer.produce_outline(&preferences).await });
            let result = match tokio::time::timeout(timeout, &mut job).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    error!("Outline task for run {} failed: {}", run_id, e);
                    Err(OutlineFailure::model_error(format!(
                        "outline task failed: {}",
                        e
                    )))
                }
                Err(_) => {
                    job.abort();
                    Err(OutlineFailure::model_error(format!(
                        "outline timed out after {}s",
                        timeout.as_secs()
                    )))
                }
            };
            let _ = tx.send(Command::OutlineFinished { run_id, result }).await;
        });
    }

    fn on_outline_finished(
        &mut self,
        run_id: RunId,
        result: Result<OutlineResult, OutlineFailure>,
    ) {
        let planner = self.planner;
        let Some(run) = self.current_run_mut(&run_id) else {
            debug!("Discarding outline for stale run {}", run_id);
            return;
        };
        if run.phase() != GenerationPhase::GeneratingOutline {
            warn!("Ignoring outline for run {} in phase {}", run_id, run.phase());
            return;
        }

        let outcome = match result {
            Ok(result) => {
                let destination = result.outline.destination.clone();
                run.apply_outline(result, &planner)
                    .map(|chunks| (destination, chunks))
            }
            Err(failure) => {
                run.apply_outline_failure(failure.clone());
                Err(failure)
            }
        };

        match outcome {
            Ok((destination, chunks)) => {
                let total_days = self.run.as_ref().map_or(0, |r| r.total_days());
                info!(
                    "Outline ready for run {}: {} days in {} chunks",
                    run_id,
                    total_days,
                    chunks.len()
                );
                self.publish();
                self.emit(GenerationEvent::OutlineReady {
                    run_id: run_id.clone(),
                    destination,
                    total_days,
                    chunks: chunks.clone(),
                });

                if let Some(run) = self.run.as_mut() {
                    run.begin_details();
                }
                self.launch_initial_chunks(chunks);
                self.publish();
            }
            Err(failure) => self.report_outline_failure(run_id, failure),
        }
    }

    fn report_outline_failure(&mut self, run_id: RunId, failure: OutlineFailure) {
        warn!("Outline failed for run {}: {}", run_id, failure);
        metrics::RUNS_FINISHED
            .with_label_values(&["outline_failed"])
            .inc();
        self.publish();
        self.emit(GenerationEvent::OutlineFailed {
            run_id,
            reason: failure.reason,
            message: failure.message,
        });
    }

    fn launch_initial_chunks(&mut self, chunks: Vec<DayRange>) {
        if self.config.lead_chunk_first && chunks.len() > 1 {
            let mut chunks = chunks.into_iter();
            if let Some(lead) = chunks.next() {
                self.lead_chunk = Some(lead);
                self.deferred = chunks.collect();
                self.launch_chunk(lead);
            }
            return;
        }
        for range in chunks {
            self.launch_chunk(range);
        }
    }

    fn launch_chunk(&mut self, range: DayRange) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let Some(tx) = self.tx.upgrade() else {
            return;
        };

        let (request, attempt) = run.begin_chunk(range);
        let run_id = run.run_id().clone();
        debug!("Launching chunk {} for run {} (attempt {})", range, run_id, attempt);

        self.emit(GenerationEvent::ChunkStarted {
            run_id: run_id.clone(),
            range,
            attempt,
        });

        let producer = Arc::clone(&self.chunk_producer);
        let timeout = self.config.chunk_timeout();
        tokio::spawn(async move {
            let started = Instant::now();
            let mut job = tokio::spawn(async move { producer.produce_chunk(&request).await });
            let outcome = match tokio::time::timeout(timeout, &mut job).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    error!("Chunk {} task for run {} failed: {}", range, run_id, e);
                    Err(ChunkFailure::model_error(format!(
                        "chunk {} task failed: {}",
                        range, e
                    )))
                }
                Err(_) => {
                    job.abort();
                    Err(ChunkFailure::timeout(format!(
                        "chunk {} timed out after {}s",
                        range,
                        timeout.as_secs()
                    )))
                }
            };
            let result = ChunkResult {
                run_id,
                range,
                attempt,
                outcome,
                elapsed: started.elapsed(),
            };
            let _ = tx.send(Command::ChunkFinished(result)).await;
        });
    }

    fn on_chunk_finished(&mut self, result: ChunkResult) {
        let ChunkResult {
            run_id,
            range,
            attempt,
            outcome,
            elapsed,
        } = result;

        let label = match &outcome {
            Ok(_) => "success",
            Err(failure) => failure.reason.as_str(),
        };
        metrics::CHUNK_DURATION
            .with_label_values(&[label])
            .observe(elapsed.as_secs_f64());

        let Some(run) = self.current_run_mut(&run_id) else {
            debug!("Discarding chunk {} for stale run {}", range, run_id);
            metrics::CHUNK_ATTEMPTS.with_label_values(&["stale"]).inc();
            return;
        };
        if run.phase() != GenerationPhase::GeneratingDetails {
            warn!("Ignoring chunk {} for run {} in phase {}", range, run_id, run.phase());
            return;
        }
        metrics::CHUNK_ATTEMPTS.with_label_values(&[label]).inc();

        let event = match outcome {
            Ok(days) => {
                let applied = run.apply_chunk_success(range, days);
                if !applied.dropped.is_empty() {
                    warn!(
                        "Chunk {} for run {} returned days outside its range: {:?}",
                        range, run_id, applied.dropped
                    );
                }
                if !applied.missing.is_empty() {
                    warn!(
                        "Chunk {} for run {} is missing days {:?}",
                        range, run_id, applied.missing
                    );
                }
                info!(
                    "Chunk {} for run {} completed in {:.1}s (attempt {})",
                    range,
                    run_id,
                    elapsed.as_secs_f64(),
                    attempt
                );
                GenerationEvent::ChunkCompleted {
                    run_id: run_id.clone(),
                    range,
                    days: applied.completed,
                }
            }
            Err(failure) => {
                run.apply_chunk_failure(range);
                warn!(
                    "Chunk {} for run {} failed (attempt {}): {}",
                    range, run_id, attempt, failure
                );
                GenerationEvent::ChunkFailed {
                    run_id: run_id.clone(),
                    range,
                    reason: failure.reason,
                    message: failure.message,
                }
            }
        };

        self.emit(event);

        if self.lead_chunk == Some(range) {
            self.lead_chunk = None;
            for deferred in std::mem::take(&mut self.deferred) {
                self.launch_chunk(deferred);
            }
        }

        self.check_completion();
        self.publish();
    }

    fn check_completion(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let Some(itinerary) = run.try_complete() else {
            return;
        };

        let run_id = run.run_id().clone();
        info!(
            "Run {} completed: {} days merged into itinerary {}",
            run_id,
            itinerary.duration_days(),
            itinerary.id
        );
        metrics::RUNS_FINISHED.with_label_values(&["completed"]).inc();
        self.emit(GenerationEvent::RunCompleted {
            run_id,
            itinerary_id: itinerary.id.clone(),
            total_days: itinerary.duration_days(),
        });

        self.spawn_persist(itinerary);
    }

    // ------------------------------------------------------------------------
    // Retry
    // ------------------------------------------------------------------------

    fn retry(&mut self, range: DayRange) -> Result<(), RetryError> {
        let max_attempts = self.config.max_chunk_attempts;
        let checked = match self.run.as_ref() {
            Some(run) => run.check_retry(range, max_attempts),
            None => Err(RetryError::NotGenerating {
                phase: GenerationPhase::Idle,
            }),
        };

        if let Err(e) = checked {
            info!("Rejected retry of {}: {}", range, e);
            metrics::RETRIES.with_label_values(&["rejected"]).inc();
            return Err(e);
        }

        metrics::RETRIES.with_label_values(&["accepted"]).inc();
        self.launch_chunk(range);
        self.publish();
        Ok(())
    }

    fn retry_failed(&mut self) -> Result<Vec<DayRange>, RetryError> {
        let ranges = match self.run.as_ref() {
            Some(run) if run.phase() == GenerationPhase::GeneratingDetails => run.failed_ranges(),
            Some(run) => return Err(RetryError::NotGenerating { phase: run.phase() }),
            None => {
                return Err(RetryError::NotGenerating {
                    phase: GenerationPhase::Idle,
                })
            }
        };

        let mut launched = Vec::with_capacity(ranges.len());
        let mut first_rejection = None;
        for range in ranges {
            match self.retry(range) {
                Ok(()) => launched.push(range),
                Err(e) => {
                    first_rejection.get_or_insert(e);
                }
            }
        }

        match (launched.is_empty(), first_rejection) {
            (true, Some(e)) => Err(e),
            _ => Ok(launched),
        }
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    fn spawn_persist(&mut self, itinerary: Itinerary) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let Some(tx) = self.tx.upgrade() else {
            return;
        };

        run.set_persistence(PersistenceStatus::InProgress);
        let run_id = run.run_id().clone();
        let preferences = run.preferences();
        let caller = run.caller().clone();
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            let job =
                tokio::spawn(async move { sink.persist(&preferences, &itinerary, &caller).await });
            let result = match job.await {
                Ok(result) => result,
                Err(e) => Err(PersistenceError::TaskFailed(e.to_string())),
            };
            let _ = tx.send(Command::PersistFinished { run_id, result }).await;
        });
    }

    fn retry_persistence(&mut self) -> Result<(), GenerationError> {
        let itinerary = match self.run.as_ref() {
            Some(run) => match (run.persistence(), run.itinerary()) {
                (PersistenceStatus::Failed { .. }, Some(itinerary)) => itinerary.clone(),
                (status, _) => {
                    return Err(GenerationError::PersistenceNotRetryable(format!(
                        "run {} persistence is {}",
                        run.run_id(),
                        persistence_label(status)
                    )))
                }
            },
            None => {
                return Err(GenerationError::PersistenceNotRetryable(
                    "no run".to_string(),
                ))
            }
        };

        info!("Retrying persistence of itinerary {}", itinerary.id);
        self.spawn_persist(itinerary);
        self.publish();
        Ok(())
    }

    fn on_persist_finished(
        &mut self,
        run_id: RunId,
        result: Result<PersistReceipt, PersistenceError>,
    ) {
        let Some(run) = self.current_run_mut(&run_id) else {
            // The save itself happened; only the read model is gone.
            info!("Persistence finished for abandoned run {}", run_id);
            return;
        };

        match result {
            Ok(receipt) => {
                info!(
                    "Run {} persisted to {} storage as {}",
                    run_id,
                    receipt.kind.as_str(),
                    receipt.reference
                );
                metrics::PERSIST_TOTAL
                    .with_label_values(&[receipt.kind.as_str()])
                    .inc();
                let event = GenerationEvent::Persisted {
                    run_id,
                    reference: receipt.reference.clone(),
                    kind: receipt.kind,
                };
                run.set_persistence(PersistenceStatus::Saved { receipt });
                self.emit(event);
            }
            Err(e) => {
                error!("Failed to persist run {}: {}", run_id, e);
                metrics::PERSIST_TOTAL.with_label_values(&["failed"]).inc();
                run.set_persistence(PersistenceStatus::Failed {
                    message: e.to_string(),
                });
                self.emit(GenerationEvent::PersistenceFailed {
                    run_id,
                    message: e.to_string(),
                });
            }
        }
        self.publish();
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// The current run, if `run_id` still identifies it.
    fn current_run_mut(&mut self, run_id: &RunId) -> Option<&mut RunState> {
        self.run.as_mut().filter(|run| run.run_id() == run_id)
    }

    fn publish(&self) {
        let snapshot = self
            .run
            .as_ref()
            .map(RunState::snapshot)
            .unwrap_or_default();
        self.progress_tx.send_replace(snapshot);
    }

    fn emit(&self, event: GenerationEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }
}

fn persistence_label(status: &PersistenceStatus) -> &'static str {
    match status {
        PersistenceStatus::NotStarted => "not started",
        PersistenceStatus::InProgress => "in progress",
        PersistenceStatus::Saved { .. } => "already saved",
        PersistenceStatus::Failed { .. } => "failed",
    }
}
