//! Mock outline and chunk producers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::fixtures;
use crate::generation::{
    ChunkFailure, ChunkProducer, ChunkRequest, OutlineFailure, OutlineProducer, OutlineResult,
};
use crate::planner::DayRange;
use crate::trip::{DayPlan, TripPreferences};

/// Days used when the preferences leave the duration open.
const UNDECIDED_DAYS: u32 = 3;

/// Mock implementation of the OutlineProducer trait.
///
/// By default it returns an outline for the requested destination and
/// duration (three days when undecided).
#[derive(Debug, Default)]
pub struct MockOutlineProducer {
    result: Arc<RwLock<Option<OutlineResult>>>,
    failure: Arc<RwLock<Option<OutlineFailure>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    calls: Arc<RwLock<Vec<TripPreferences>>>,
}

impl MockOutlineProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always return this result.
    pub async fn set_result(&self, result: OutlineResult) {
        *self.result.write().await = Some(result);
    }

    /// Fail every call with this failure until cleared.
    pub async fn set_failure(&self, failure: OutlineFailure) {
        *self.failure.write().await = Some(failure);
    }

    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }

    /// Sleep before answering.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Preferences of every call, in call order.
    pub async fn calls(&self) -> Vec<TripPreferences> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl OutlineProducer for MockOutlineProducer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn produce_outline(
        &self,
        preferences: &TripPreferences,
    ) -> Result<OutlineResult, OutlineFailure> {
        self.calls.write().await.push(preferences.clone());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = self.failure.read().await.clone() {
            return Err(failure);
        }
        if let Some(result) = self.result.read().await.clone() {
            return Ok(result);
        }

        let destination = preferences
            .destination_label()
            .unwrap_or_else(|| "Lisbon".to_string());
        let days = match preferences.duration.days() {
            0 => UNDECIDED_DAYS,
            days => days,
        };
        let mut resolved = preferences.clone();
        if !resolved.destination_decided {
            resolved.destinations = vec![destination.clone()];
            resolved.destination_decided = true;
        }
        Ok(OutlineResult::new(
            fixtures::outline(&destination, days),
            resolved,
        ))
    }
}

/// Mock implementation of the ChunkProducer trait.
///
/// Returns one generated day per requested day unless told otherwise:
/// - `fail_range` makes the next N calls for a range fail
/// - `panic_range` makes the next N calls for a range panic
/// - `set_delay` holds a range back, so completion order can be controlled
/// - `set_days` overrides what a range returns
#[derive(Debug, Default)]
pub struct MockChunkProducer {
    failures: Arc<RwLock<HashMap<DayRange, u32>>>,
    panics: Arc<RwLock<HashMap<DayRange, u32>>>,
    delays: Arc<RwLock<HashMap<DayRange, Duration>>>,
    overrides: Arc<RwLock<HashMap<DayRange, Vec<DayPlan>>>>,
    requests: Arc<RwLock<Vec<ChunkRequest>>>,
}

impl MockChunkProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls for `range`.
    pub async fn fail_range(&self, range: DayRange, times: u32) {
        self.failures.write().await.insert(range, times);
    }

    /// Fail every call for `range`.
    pub async fn always_fail(&self, range: DayRange) {
        self.fail_range(range, u32::MAX).await;
    }

    /// Panic on the next `times` calls for `range`.
    pub async fn panic_range(&self, range: DayRange, times: u32) {
        self.panics.write().await.insert(range, times);
    }

    pub async fn set_delay(&self, range: DayRange, delay: Duration) {
        self.delays.write().await.insert(range, delay);
    }

    pub async fn set_days(&self, range: DayRange, days: Vec<DayPlan>) {
        self.overrides.write().await.insert(range, days);
    }

    /// Every request received, in call order.
    pub async fn requests(&self) -> Vec<ChunkRequest> {
        self.requests.read().await.clone()
    }

    /// Number of calls made for `range`.
    pub async fn calls_for(&self, range: DayRange) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|r| r.range == range)
            .count()
    }
}

#[async_trait]
impl ChunkProducer for MockChunkProducer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn produce_chunk(&self, request: &ChunkRequest) -> Result<Vec<DayPlan>, ChunkFailure> {
        let range = request.range;
        self.requests.write().await.push(request.clone());

        let delay = self.delays.read().await.get(&range).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let panic_now = match self.panics.write().await.get_mut(&range) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };
        if panic_now {
            panic!("mock panic for days {}", range);
        }

        {
            let mut failures = self.failures.write().await;
            if let Some(remaining) = failures.get_mut(&range) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    return Err(ChunkFailure::model_error(format!(
                        "mock failure for days {}",
                        range
                    )));
                }
            }
        }

        if let Some(days) = self.overrides.read().await.get(&range) {
            return Ok(days.clone());
        }
        Ok(fixtures::day_plans(range))
    }
}
