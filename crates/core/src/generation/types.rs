//! Types for the generation orchestrator.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::persistence::PersistReceipt;
use crate::planner::DayRange;
use crate::trip::Outline;

/// Identifier of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle phase of a run.
///
/// ```text
/// idle -> generating_outline -> outline_ready -> generating_details -> completed
///                  |
///                  +-> error
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    #[default]
    Idle,
    GeneratingOutline,
    OutlineReady,
    GeneratingDetails,
    Completed,
    Error,
}

impl GenerationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationPhase::Idle => "idle",
            GenerationPhase::GeneratingOutline => "generating_outline",
            GenerationPhase::OutlineReady => "outline_ready",
            GenerationPhase::GeneratingDetails => "generating_details",
            GenerationPhase::Completed => "completed",
            GenerationPhase::Error => "error",
        }
    }

    pub fn is_generating(&self) -> bool {
        matches!(
            self,
            GenerationPhase::GeneratingOutline | GenerationPhase::GeneratingDetails
        )
    }
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generation status of a single day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Pending,
    Generating,
    Completed,
    Error,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Pending => "pending",
            DayStatus::Generating => "generating",
            DayStatus::Completed => "completed",
            DayStatus::Error => "error",
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who asked for the run. Only decides where the result is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

// ============================================================================
// Producer failures
// ============================================================================

/// Why the outline could not be produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutlineFailureReason {
    /// Usage limit hit; surfaced separately so callers can tell the user to wait.
    RateLimited,
    ModelError,
    InvalidInput,
}

impl OutlineFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutlineFailureReason::RateLimited => "rate_limited",
            OutlineFailureReason::ModelError => "model_error",
            OutlineFailureReason::InvalidInput => "invalid_input",
        }
    }
}

impl fmt::Display for OutlineFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outline generation failed. Fatal to the run.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[error("outline generation failed ({reason}): {message}")]
pub struct OutlineFailure {
    pub reason: OutlineFailureReason,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl OutlineFailure {
    pub fn rate_limited(message: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        Self {
            reason: OutlineFailureReason::RateLimited,
            message: message.into(),
            retry_after_secs,
        }
    }

    pub fn model_error(message: impl Into<String>) -> Self {
        Self {
            reason: OutlineFailureReason::ModelError,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            reason: OutlineFailureReason::InvalidInput,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.reason == OutlineFailureReason::RateLimited
    }
}

/// Why a chunk could not be produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkFailureReason {
    ModelError,
    Timeout,
}

impl ChunkFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkFailureReason::ModelError => "model_error",
            ChunkFailureReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ChunkFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chunk failed. Local to its day range.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[error("chunk generation failed ({reason}): {message}")]
pub struct ChunkFailure {
    pub reason: ChunkFailureReason,
    pub message: String,
}

impl ChunkFailure {
    pub fn model_error(message: impl Into<String>) -> Self {
        Self {
            reason: ChunkFailureReason::ModelError,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            reason: ChunkFailureReason::Timeout,
            message: message.into(),
        }
    }
}

// ============================================================================
// Caller-facing errors
// ============================================================================

/// A retry request was rejected. State is left untouched.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RetryError {
    #[error("no run is generating details (phase: {phase})")]
    NotGenerating { phase: GenerationPhase },

    #[error("invalid day range {range} for a {total_days}-day trip")]
    InvalidRange { range: DayRange, total_days: u32 },

    #[error("day {day} is {status}, only failed days can be retried")]
    NotFailed { day: u32, status: DayStatus },

    #[error("range {range} used all {max_attempts} attempts")]
    AttemptsExhausted { range: DayRange, max_attempts: u32 },

    #[error("generation coordinator is not running")]
    CoordinatorClosed,
}

/// Errors returned by the generation handle.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    #[error("generation coordinator is not running")]
    CoordinatorClosed,

    #[error("persistence cannot be retried: {0}")]
    PersistenceNotRetryable(String),
}

// ============================================================================
// Progress read model
// ============================================================================

/// Where the finished itinerary stands with the persistence sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PersistenceStatus {
    #[default]
    NotStarted,
    InProgress,
    Saved {
        receipt: PersistReceipt,
    },
    Failed {
        message: String,
    },
}

/// Consistent, point-in-time view of the current run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProgressSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub phase: GenerationPhase,
    pub total_days: u32,
    pub completed_day_count: u32,
    pub status_by_day: BTreeMap<u32, DayStatus>,
    /// Days with a chunk call in flight, ascending.
    pub generating_days: Vec<u32>,
    /// Days whose last chunk call failed, ascending.
    pub failed_days: Vec<u32>,
    pub chunks: Vec<DayRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OutlineFailure>,
    pub persistence: PersistenceStatus,
    pub updated_at: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn status_of(&self, day: u32) -> Option<DayStatus> {
        self.status_by_day.get(&day).copied()
    }

    pub fn days_with(&self, status: DayStatus) -> Vec<u32> {
        self.status_by_day
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(day, _)| *day)
            .collect()
    }

    /// Nothing is in flight for the details phase.
    pub fn is_settled(&self) -> bool {
        self.phase == GenerationPhase::GeneratingDetails && self.generating_days.is_empty()
    }

    pub fn persisted_receipt(&self) -> Option<&PersistReceipt> {
        match &self.persistence {
            PersistenceStatus::Saved { receipt } => Some(receipt),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&GenerationPhase::GeneratingDetails).unwrap();
        assert_eq!(json, "\"generating_details\"");
        assert_eq!(GenerationPhase::OutlineReady.to_string(), "outline_ready");
        assert!(GenerationPhase::GeneratingOutline.is_generating());
        assert!(!GenerationPhase::Completed.is_generating());
    }

    #[test]
    fn test_outline_failure_display() {
        let failure = OutlineFailure::rate_limited("daily limit reached", Some(3600));
        assert!(failure.is_rate_limited());
        assert_eq!(
            failure.to_string(),
            "outline generation failed (rate_limited): daily limit reached"
        );
    }

    #[test]
    fn test_retry_error_display() {
        let err = RetryError::NotFailed {
            day: 5,
            status: DayStatus::Generating,
        };
        assert_eq!(
            err.to_string(),
            "day 5 is generating, only failed days can be retried"
        );

        let err = RetryError::InvalidRange {
            range: DayRange::new(4, 12),
            total_days: 9,
        };
        assert_eq!(err.to_string(), "invalid day range 4-12 for a 9-day trip");
    }

    #[test]
    fn test_caller() {
        assert!(!Caller::anonymous().is_authenticated());
        assert!(Caller::user("u-1").is_authenticated());
    }

    #[test]
    fn test_default_snapshot_is_idle() {
        let snapshot = ProgressSnapshot::default();
        assert_eq!(snapshot.phase, GenerationPhase::Idle);
        assert!(snapshot.run_id.is_none());
        assert_eq!(snapshot.persistence, PersistenceStatus::NotStarted);
        assert!(snapshot.persisted_receipt().is_none());
    }

    #[test]
    fn test_snapshot_status_queries() {
        let mut snapshot = ProgressSnapshot {
            phase: GenerationPhase::GeneratingDetails,
            ..Default::default()
        };
        snapshot.status_by_day.insert(1, DayStatus::Completed);
        snapshot.status_by_day.insert(2, DayStatus::Error);
        snapshot.status_by_day.insert(3, DayStatus::Completed);

        assert_eq!(snapshot.days_with(DayStatus::Completed), vec![1, 3]);
        assert_eq!(snapshot.status_of(2), Some(DayStatus::Error));
        assert_eq!(snapshot.status_of(4), None);
        assert!(snapshot.is_settled());
    }
}
