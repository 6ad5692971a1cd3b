use serde::{Deserialize, Serialize};

use super::types::{ChunkFailureReason, OutlineFailureReason, RunId};
use crate::persistence::StorageKind;
use crate::planner::DayRange;

/// Progress notifications published by the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    RunStarted {
        run_id: RunId,
    },
    OutlineReady {
        run_id: RunId,
        destination: String,
        total_days: u32,
        chunks: Vec<DayRange>,
    },
    OutlineFailed {
        run_id: RunId,
        reason: OutlineFailureReason,
        message: String,
    },
    ChunkStarted {
        run_id: RunId,
        range: DayRange,
        attempt: u32,
    },
    ChunkCompleted {
        run_id: RunId,
        range: DayRange,
        /// Days from the range that were actually produced.
        days: Vec<u32>,
    },
    ChunkFailed {
        run_id: RunId,
        range: DayRange,
        reason: ChunkFailureReason,
        message: String,
    },
    RunCompleted {
        run_id: RunId,
        itinerary_id: String,
        total_days: u32,
    },
    Persisted {
        run_id: RunId,
        reference: String,
        kind: StorageKind,
    },
    PersistenceFailed {
        run_id: RunId,
        message: String,
    },
}

impl GenerationEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            GenerationEvent::RunStarted { run_id }
            | GenerationEvent::OutlineReady { run_id, .. }
            | GenerationEvent::OutlineFailed { run_id, .. }
            | GenerationEvent::ChunkStarted { run_id, .. }
            | GenerationEvent::ChunkCompleted { run_id, .. }
            | GenerationEvent::ChunkFailed { run_id, .. }
            | GenerationEvent::RunCompleted { run_id, .. }
            | GenerationEvent::Persisted { run_id, .. }
            | GenerationEvent::PersistenceFailed { run_id, .. } => run_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            GenerationEvent::RunStarted { .. } => "run_started",
            GenerationEvent::OutlineReady { .. } => "outline_ready",
            GenerationEvent::OutlineFailed { .. } => "outline_failed",
            GenerationEvent::ChunkStarted { .. } => "chunk_started",
            GenerationEvent::ChunkCompleted { .. } => "chunk_completed",
            GenerationEvent::ChunkFailed { .. } => "chunk_failed",
            GenerationEvent::RunCompleted { .. } => "run_completed",
            GenerationEvent::Persisted { .. } => "persisted",
            GenerationEvent::PersistenceFailed { .. } => "persistence_failed",
        }
    }
}
