//! State of a single run.
//!
//! `RunState` is a plain reducer: the coordinator owns it, feeds it producer
//! results and caller commands one at a time, and reads snapshots from it.
//! It performs no I/O.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::merge::{build_itinerary, merge_days, ItineraryParts};
use super::traits::{ChunkRequest, OutlineResult};
use super::types::{
    Caller, DayStatus, GenerationPhase, OutlineFailure, PersistenceStatus, ProgressSnapshot,
    RetryError, RunId,
};
use crate::planner::{resolve_total_days, ChunkPlanner, DayRange};
use crate::trip::{
    ContextArticle, DayPlan, HeroImage, Itinerary, ModelInfo, Outline, TripDuration,
    TripPreferences,
};

/// What a successful chunk call did to its range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkApplied {
    /// Days marked completed.
    pub completed: Vec<u32>,
    /// Days of the range the producer did not return; now in error.
    pub missing: Vec<u32>,
    /// Returned day numbers outside the range; discarded.
    pub dropped: Vec<u32>,
}

#[derive(Debug)]
pub struct RunState {
    run_id: RunId,
    caller: Caller,
    phase: GenerationPhase,
    preferences: Arc<TripPreferences>,
    outline: Option<Arc<Outline>>,
    context: Arc<[ContextArticle]>,
    hero_image: Option<HeroImage>,
    model_info: Option<ModelInfo>,
    total_days: u32,
    chunks: Vec<DayRange>,
    statuses: BTreeMap<u32, DayStatus>,
    /// Produced days in completion order.
    completed: Vec<DayPlan>,
    attempts: BTreeMap<u32, u32>,
    error: Option<OutlineFailure>,
    itinerary: Option<Itinerary>,
    persistence: PersistenceStatus,
    updated_at: DateTime<Utc>,
}

impl RunState {
    /// A fresh run waiting for its outline.
    pub fn new(run_id: RunId, preferences: TripPreferences, caller: Caller) -> Self {
        Self {
            run_id,
            caller,
            phase: GenerationPhase::GeneratingOutline,
            preferences: Arc::new(preferences),
            outline: None,
            context: Arc::from(Vec::new()),
            hero_image: None,
            model_info: None,
            total_days: 0,
            chunks: Vec::new(),
            statuses: BTreeMap::new(),
            completed: Vec::new(),
            attempts: BTreeMap::new(),
            error: None,
            itinerary: None,
            persistence: PersistenceStatus::NotStarted,
            updated_at: Utc::now(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn phase(&self) -> GenerationPhase {
        self.phase
    }

    pub fn preferences(&self) -> Arc<TripPreferences> {
        Arc::clone(&self.preferences)
    }

    pub fn total_days(&self) -> u32 {
        self.total_days
    }

    pub fn chunks(&self) -> &[DayRange] {
        &self.chunks
    }

    pub fn status_of(&self, day: u32) -> Option<DayStatus> {
        self.statuses.get(&day).copied()
    }

    pub fn itinerary(&self) -> Option<&Itinerary> {
        self.itinerary.as_ref()
    }

    pub fn persistence(&self) -> &PersistenceStatus {
        &self.persistence
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ------------------------------------------------------------------------
    // Outline phase
    // ------------------------------------------------------------------------

    /// Accept the outline and plan the chunks. All days start `pending`.
    ///
    /// An outline that resolves to zero days, or to more days than the
    /// planner admits, fails the run.
    pub fn apply_outline(
        &mut self,
        result: OutlineResult,
        planner: &ChunkPlanner,
    ) -> Result<Vec<DayRange>, OutlineFailure> {
        let total_days = resolve_total_days(&result.resolved_preferences, &result.outline);
        if total_days == 0 {
            let failure = OutlineFailure::model_error("outline contains no days");
            self.apply_outline_failure(failure.clone());
            return Err(failure);
        }
        if !planner.admits(total_days) {
            let failure = OutlineFailure::invalid_input(format!(
                "trip of {} days exceeds the {}-day limit",
                total_days,
                planner.max_trip_days()
            ));
            self.apply_outline_failure(failure.clone());
            return Err(failure);
        }

        let mut preferences = result.resolved_preferences;
        if !preferences.duration.is_decided() {
            preferences.duration = TripDuration::Days(total_days);
        }

        self.preferences = Arc::new(preferences);
        self.outline = Some(Arc::new(result.outline));
        self.context = Arc::from(result.context);
        self.hero_image = result.hero_image;
        self.model_info = result.model_info;
        self.total_days = total_days;
        self.chunks = planner.plan(total_days);
        self.statuses = (1..=total_days).map(|d| (d, DayStatus::Pending)).collect();
        self.phase = GenerationPhase::OutlineReady;
        self.touch();

        Ok(self.chunks.clone())
    }

    pub fn apply_outline_failure(&mut self, failure: OutlineFailure) {
        self.error = Some(failure);
        self.phase = GenerationPhase::Error;
        self.touch();
    }

    pub fn begin_details(&mut self) {
        if self.phase == GenerationPhase::OutlineReady {
            self.phase = GenerationPhase::GeneratingDetails;
            self.touch();
        }
    }

    // ------------------------------------------------------------------------
    // Details phase
    // ------------------------------------------------------------------------

    /// Mark a range as generating and build the request for it.
    ///
    /// Returns the attempt number, the highest among the range's days.
    pub fn begin_chunk(&mut self, range: DayRange) -> (ChunkRequest, u32) {
        let mut attempt = 0;
        for day in range.days() {
            self.statuses.insert(day, DayStatus::Generating);
            let count = self.attempts.entry(day).or_insert(0);
            *count += 1;
            attempt = attempt.max(*count);
        }
        self.touch();

        let (destination, outline_days, previous_overnight_location) = match &self.outline {
            Some(outline) => (
                outline.destination.clone(),
                outline.slice(range),
                outline.previous_overnight_location(range.start),
            ),
            None => (String::new(), Vec::new(), None),
        };

        let request = ChunkRequest {
            preferences: Arc::clone(&self.preferences),
            context: Arc::clone(&self.context),
            destination,
            outline_days,
            range,
            previous_overnight_location,
        };
        (request, attempt)
    }

    /// Check a caller retry without touching state.
    ///
    /// Every day of the range must be in `error`; `max_attempts == 0` means
    /// unlimited.
    pub fn check_retry(&self, range: DayRange, max_attempts: u32) -> Result<(), RetryError> {
        if self.phase != GenerationPhase::GeneratingDetails {
            return Err(RetryError::NotGenerating { phase: self.phase });
        }
        if !range.is_valid() || range.end > self.total_days {
            return Err(RetryError::InvalidRange {
                range,
                total_days: self.total_days,
            });
        }
        for day in range.days() {
            let status = self.status_of(day).unwrap_or(DayStatus::Pending);
            if status != DayStatus::Error {
                return Err(RetryError::NotFailed { day, status });
            }
        }
        if max_attempts > 0 {
            let used = range
                .days()
                .map(|d| self.attempts.get(&d).copied().unwrap_or(0))
                .max()
                .unwrap_or(0);
            if used >= max_attempts {
                return Err(RetryError::AttemptsExhausted {
                    range,
                    max_attempts,
                });
            }
        }
        Ok(())
    }

    /// Apply produced days for a range that was generating.
    pub fn apply_chunk_success(&mut self, range: DayRange, days: Vec<DayPlan>) -> ChunkApplied {
        let mut applied = ChunkApplied::default();

        for plan in days {
            if !range.contains(plan.day) {
                applied.dropped.push(plan.day);
                continue;
            }
            match self.status_of(plan.day) {
                Some(DayStatus::Generating) => {
                    self.statuses.insert(plan.day, DayStatus::Completed);
                    applied.completed.push(plan.day);
                    self.completed.push(plan);
                }
                // Same day twice in one response; merge keeps the later one.
                Some(DayStatus::Completed) if applied.completed.contains(&plan.day) => {
                    self.completed.push(plan);
                }
                other => {
                    warn!(
                        run_id = %self.run_id,
                        day = plan.day,
                        status = ?other,
                        "Ignoring produced day that is not generating"
                    );
                }
            }
        }

        for day in range.days() {
            if self.status_of(day) == Some(DayStatus::Generating) {
                self.statuses.insert(day, DayStatus::Error);
                applied.missing.push(day);
            }
        }

        applied.completed.sort_unstable();
        self.touch();
        applied
    }

    /// Mark the generating days of a range as failed. Returns those days.
    pub fn apply_chunk_failure(&mut self, range: DayRange) -> Vec<u32> {
        let mut failed = Vec::new();
        for day in range.days() {
            if self.status_of(day) == Some(DayStatus::Generating) {
                self.statuses.insert(day, DayStatus::Error);
                failed.push(day);
            }
        }
        self.touch();
        failed
    }

    /// Contiguous runs of failed days, split at the planned chunk boundaries.
    pub fn failed_ranges(&self) -> Vec<DayRange> {
        let mut ranges = Vec::new();
        for chunk in &self.chunks {
            let mut start: Option<u32> = None;
            for day in chunk.days() {
                let failed = self.status_of(day) == Some(DayStatus::Error);
                match (failed, start) {
                    (true, None) => start = Some(day),
                    (false, Some(s)) => {
                        ranges.push(DayRange::new(s, day - 1));
                        start = None;
                    }
                    _ => {}
                }
            }
            if let Some(s) = start {
                ranges.push(DayRange::new(s, chunk.end));
            }
        }
        ranges
    }

    pub fn completed_day_count(&self) -> u32 {
        self.statuses
            .values()
            .filter(|s| **s == DayStatus::Completed)
            .count() as u32
    }

    /// Merge into the itinerary once every day is completed.
    ///
    /// Returns the itinerary on the one call that performs the merge and
    /// `None` on every other call.
    pub fn try_complete(&mut self) -> Option<Itinerary> {
        if self.phase != GenerationPhase::GeneratingDetails || self.itinerary.is_some() {
            return None;
        }
        if self.total_days == 0 || self.completed_day_count() < self.total_days {
            return None;
        }

        let days = match merge_days(&self.completed, self.total_days) {
            Ok(days) => days,
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "All days completed but merge failed");
                return None;
            }
        };

        let itinerary = build_itinerary(
            ItineraryParts {
                outline: self.outline.as_deref(),
                hero_image: self.hero_image.as_ref(),
                context: &self.context,
                model_info: self.model_info.as_ref(),
            },
            days,
        );

        self.itinerary = Some(itinerary.clone());
        self.phase = GenerationPhase::Completed;
        self.touch();
        Some(itinerary)
    }

    pub fn set_persistence(&mut self, status: PersistenceStatus) {
        self.persistence = status;
        self.touch();
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            run_id: Some(self.run_id.clone()),
            phase: self.phase,
            total_days: self.total_days,
            completed_day_count: self.completed_day_count(),
            status_by_day: self.statuses.clone(),
            generating_days: self.days_with(DayStatus::Generating),
            failed_days: self.days_with(DayStatus::Error),
            chunks: self.chunks.clone(),
            outline: self.outline.as_deref().cloned(),
            error: self.error.clone(),
            persistence: self.persistence.clone(),
            updated_at: self.updated_at,
        }
    }

    fn days_with(&self, status: DayStatus) -> Vec<u32> {
        self.statuses
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(d, _)| *d)
            .collect()
    }
}
