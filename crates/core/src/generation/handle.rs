use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::events::GenerationEvent;
use super::messages::Command;
use super::types::{Caller, GenerationError, ProgressSnapshot, RetryError, RunId};
use crate::planner::DayRange;
use crate::trip::{Itinerary, TripPreferences};

/// Handle for driving the generation coordinator.
///
/// This is cheaply cloneable and can be shared across tasks. Commands go
/// through the coordinator's queue; progress reads never touch it.
#[derive(Clone)]
pub struct GenerationHandle {
    tx: mpsc::Sender<Command>,
    progress_rx: watch::Receiver<ProgressSnapshot>,
    events_tx: broadcast::Sender<GenerationEvent>,
}

impl GenerationHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<Command>,
        progress_rx: watch::Receiver<ProgressSnapshot>,
        events_tx: broadcast::Sender<GenerationEvent>,
    ) -> Self {
        Self {
            tx,
            progress_rx,
            events_tx,
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Option<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.ok()?;
        rx.await.ok()
    }

    /// Start a new run. Any run in flight is abandoned and its late results
    /// are discarded.
    pub async fn start(
        &self,
        preferences: TripPreferences,
        caller: Caller,
    ) -> Result<RunId, GenerationError> {
        self.request(|reply| Command::Start {
            preferences,
            caller,
            reply,
        })
        .await
        .ok_or(GenerationError::CoordinatorClosed)
    }

    /// Retry a day range whose days are all in error.
    pub async fn retry(&self, range: DayRange) -> Result<(), RetryError> {
        self.request(|reply| Command::Retry { range, reply })
            .await
            .unwrap_or(Err(RetryError::CoordinatorClosed))
    }

    /// Retry every failed range of the current run. Returns the launched ranges.
    pub async fn retry_failed(&self) -> Result<Vec<DayRange>, RetryError> {
        self.request(|reply| Command::RetryFailed { reply })
            .await
            .unwrap_or(Err(RetryError::CoordinatorClosed))
    }

    /// Hand the finished itinerary to the sink again after a failed save.
    pub async fn retry_persistence(&self) -> Result<(), GenerationError> {
        self.request(|reply| Command::RetryPersistence { reply })
            .await
            .unwrap_or(Err(GenerationError::CoordinatorClosed))
    }

    /// The merged itinerary of the current run, once completed.
    pub async fn itinerary(&self) -> Result<Option<Itinerary>, GenerationError> {
        self.request(|reply| Command::GetItinerary { reply })
            .await
            .ok_or(GenerationError::CoordinatorClosed)
    }

    /// Latest progress snapshot. Never blocks on the coordinator.
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress_rx.borrow().clone()
    }

    /// Receiver that wakes on every published snapshot.
    pub fn watch(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress_rx.clone()
    }

    /// Wait until a snapshot satisfies `predicate` and return it.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&ProgressSnapshot) -> bool,
    ) -> Result<ProgressSnapshot, GenerationError> {
        let mut rx = self.progress_rx.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| GenerationError::CoordinatorClosed)?;
        Ok(snapshot.clone())
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.events_tx.subscribe()
    }

    /// Ask the coordinator to stop.
    pub async fn shutdown(&self) -> Result<(), GenerationError> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| GenerationError::CoordinatorClosed)
    }
}
