//! Collaborator traits for the generation coordinator.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{ChunkFailure, OutlineFailure};
use crate::planner::DayRange;
use crate::trip::{ContextArticle, DayPlan, HeroImage, ModelInfo, Outline, OutlineDay, TripPreferences};

/// Everything the outline phase hands over to the details phase.
#[derive(Debug, Clone)]
pub struct OutlineResult {
    pub outline: Outline,
    /// Preferences after the producer filled in or resolved open fields
    /// (e.g. a suggested destination). Chunk calls use these.
    pub resolved_preferences: TripPreferences,
    /// Supporting articles shared by every chunk call and listed as references.
    pub context: Vec<ContextArticle>,
    pub hero_image: Option<HeroImage>,
    pub model_info: Option<ModelInfo>,
}

impl OutlineResult {
    pub fn new(outline: Outline, resolved_preferences: TripPreferences) -> Self {
        Self {
            outline,
            resolved_preferences,
            context: Vec::new(),
            hero_image: None,
            model_info: None,
        }
    }
}

/// Input for a single chunk call.
///
/// Preferences and context are shared read-only across concurrent chunk calls.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub preferences: Arc<TripPreferences>,
    pub context: Arc<[ContextArticle]>,
    pub destination: String,
    /// Outline days inside `range`, in day order.
    pub outline_days: Vec<OutlineDay>,
    pub range: DayRange,
    /// Where the traveler woke up before the first day of the range.
    pub previous_overnight_location: Option<String>,
}

/// Produces the low-detail outline for a run.
#[async_trait]
pub trait OutlineProducer: Send + Sync {
    /// Returns the name of this producer implementation.
    fn name(&self) -> &str;

    /// Produces an outline for the given (prepared) preferences.
    async fn produce_outline(
        &self,
        preferences: &TripPreferences,
    ) -> Result<OutlineResult, OutlineFailure>;
}

/// Produces detailed days for one day range.
#[async_trait]
pub trait ChunkProducer: Send + Sync {
    /// Returns the name of this producer implementation.
    fn name(&self) -> &str;

    /// Produces detailed days for `request.range`.
    ///
    /// Days outside the range are ignored by the caller and days missing from
    /// the result are marked as failed.
    async fn produce_chunk(&self, request: &ChunkRequest) -> Result<Vec<DayPlan>, ChunkFailure>;
}
