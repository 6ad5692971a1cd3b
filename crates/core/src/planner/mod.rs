//! Chunk planning.
//!
//! Splits a trip's day range into contiguous chunks of bounded size so each
//! generation call stays within the model's latency and token budget.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::trip::{Outline, TripPreferences};

/// Inclusive, 1-based range of day numbers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayRange {
    pub start: u32,
    pub end: u32,
}

impl DayRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A range is valid when it starts at day 1 or later and is not reversed.
    pub fn is_valid(&self) -> bool {
        self.start >= 1 && self.start <= self.end
    }

    pub fn contains(&self, day: u32) -> bool {
        day >= self.start && day <= self.end
    }

    pub fn len(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn days(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }

    pub fn overlaps(&self, other: &DayRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for DayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Partition `1..=total_days` into chunks of at most `max_chunk_days` days.
///
/// Returns an empty list for `total_days == 0`; an undecided duration is
/// resolved against the outline before planning. A `max_chunk_days` of 0 is
/// treated as 1.
pub fn plan_chunks(total_days: u32, max_chunk_days: u32) -> Vec<DayRange> {
    let size = max_chunk_days.max(1);
    let mut chunks = Vec::new();
    let mut start = 1;

    while start <= total_days {
        let end = start.saturating_add(size - 1).min(total_days);
        chunks.push(DayRange::new(start, end));
        match end.checked_add(1) {
            Some(next) => start = next,
            None => break,
        }
    }

    chunks
}

/// Longest trip a run will plan unless configured otherwise.
pub const DEFAULT_MAX_TRIP_DAYS: u32 = 30;

/// Chunk planner with a fixed maximum chunk length and trip length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlanner {
    max_chunk_days: u32,
    max_trip_days: u32,
}

impl ChunkPlanner {
    pub fn new(max_chunk_days: u32) -> Self {
        Self {
            max_chunk_days: max_chunk_days.max(1),
            max_trip_days: DEFAULT_MAX_TRIP_DAYS,
        }
    }

    pub fn with_max_trip_days(mut self, max_trip_days: u32) -> Self {
        self.max_trip_days = max_trip_days.max(1);
        self
    }

    pub fn max_chunk_days(&self) -> u32 {
        self.max_chunk_days
    }

    pub fn max_trip_days(&self) -> u32 {
        self.max_trip_days
    }

    /// Whether a trip of `total_days` is short enough to plan.
    pub fn admits(&self, total_days: u32) -> bool {
        total_days <= self.max_trip_days
    }

    pub fn plan(&self, total_days: u32) -> Vec<DayRange> {
        plan_chunks(total_days, self.max_chunk_days)
    }
}

/// Decide how many days a run covers.
///
/// The traveler's duration wins when decided; otherwise the outline's length
/// stands in for it.
pub fn resolve_total_days(preferences: &TripPreferences, outline: &Outline) -> u32 {
    match preferences.duration.days() {
        0 => outline.days.len() as u32,
        days => days,
    }
}
