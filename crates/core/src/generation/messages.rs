//! Messages processed by the coordinator loop.

use std::time::Duration;

use tokio::sync::oneshot;

use super::traits::OutlineResult;
use super::types::{Caller, ChunkFailure, GenerationError, OutlineFailure, RetryError, RunId};
use crate::persistence::{PersistReceipt, PersistenceError};
use crate::planner::DayRange;
use crate::trip::{DayPlan, Itinerary, TripPreferences};

/// Outcome of one chunk call, tagged with the run that issued it.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub run_id: RunId,
    pub range: DayRange,
    pub attempt: u32,
    pub outcome: Result<Vec<DayPlan>, ChunkFailure>,
    pub elapsed: Duration,
}

/// Commands from handles and from spawned producer tasks.
#[derive(Debug)]
pub(crate) enum Command {
    Start {
        preferences: TripPreferences,
        caller: Caller,
        reply: oneshot::Sender<RunId>,
    },
    Retry {
        range: DayRange,
        reply: oneshot::Sender<Result<(), RetryError>>,
    },
    RetryFailed {
        reply: oneshot::Sender<Result<Vec<DayRange>, RetryError>>,
    },
    RetryPersistence {
        reply: oneshot::Sender<Result<(), GenerationError>>,
    },
    GetItinerary {
        reply: oneshot::Sender<Option<Itinerary>>,
    },
    OutlineFinished {
        run_id: RunId,
        result: Result<OutlineResult, OutlineFailure>,
    },
    ChunkFinished(ChunkResult),
    PersistFinished {
        run_id: RunId,
        result: Result<PersistReceipt, PersistenceError>,
    },
    Shutdown,
}
