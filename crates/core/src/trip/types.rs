//! Core trip data types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::duration::TripDuration;
use crate::planner::DayRange;

/// Region used when the traveler has not picked a destination or a region.
pub const DEFAULT_REGION: &str = "anywhere";

/// Theme used when the traveler did not pick any.
pub const DEFAULT_THEME: &str = "gourmet";

// ============================================================================
// Preferences
// ============================================================================

/// Who the traveler is going with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Companions {
    #[default]
    Solo,
    Couple,
    Family,
    Friends,
    Business,
}

/// Coarse budget tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Saving,
    #[default]
    Standard,
    High,
    Luxury,
}

/// Budget as either a tier or an explicit numeric range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    Tier(BudgetTier),
    Range {
        min: u32,
        max: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<String>,
    },
}

impl Default for Budget {
    fn default() -> Self {
        Budget::Tier(BudgetTier::Standard)
    }
}

/// How densely days should be packed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Relaxed,
    #[default]
    Balanced,
    Active,
    Packed,
}

/// Means of transport for a transit segment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransitMode {
    Flight,
    Train,
    Bus,
    Ship,
    Car,
    Other,
}

/// A point-to-point move, either locked by the traveler or produced by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitSegment {
    pub mode: TransitMode,
    pub departure_place: String,
    pub arrival_place: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<String>,
    /// Day the segment belongs to, when the traveler pinned it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Free-form traveler preferences. Input to one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TripPreferences {
    /// Explicit destinations, in the order the traveler gave them.
    #[serde(default)]
    pub destinations: Vec<String>,
    /// Whether the traveler picked the destination or wants one suggested.
    #[serde(default = "default_true")]
    pub destination_decided: bool,
    /// Region to pick a destination from when none is decided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Mood of the trip, e.g. "quiet hot springs".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibe: Option<String>,
    #[serde(default)]
    pub companions: Companions,
    #[serde(default)]
    pub themes: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(default)]
    pub duration: TripDuration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<Pace>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub must_visit_places: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_must_visit_places: Option<bool>,
    /// Transit the traveler already booked and the model must respect.
    #[serde(default)]
    pub transit_segments: Vec<TransitSegment>,
}

fn default_true() -> bool {
    true
}

impl TripPreferences {
    /// Preferences for a decided destination and duration.
    pub fn new(destination: impl Into<String>, duration: TripDuration) -> Self {
        Self {
            destinations: vec![destination.into()],
            destination_decided: true,
            duration,
            ..Default::default()
        }
    }

    /// Preferences that leave the destination to the outline producer.
    pub fn undecided(region: Option<String>, duration: TripDuration) -> Self {
        Self {
            destination_decided: false,
            region,
            duration,
            ..Default::default()
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.themes.insert(theme.into());
        self
    }

    pub fn with_pace(mut self, pace: Pace) -> Self {
        self.pace = Some(pace);
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Fill in the defaults the producers rely on.
    pub fn prepared(mut self) -> Self {
        if !self.destination_decided && self.region.is_none() {
            self.region = Some(DEFAULT_REGION.to_string());
        }
        if self.budget.is_none() {
            self.budget = Some(Budget::default());
        }
        if self.pace.is_none() {
            self.pace = Some(Pace::default());
        }
        if self.themes.is_empty() {
            self.themes.insert(DEFAULT_THEME.to_string());
        }
        if self.has_must_visit_places.is_none() {
            self.has_must_visit_places = Some(!self.must_visit_places.is_empty());
        }
        self
    }

    /// Human readable destination, if any was given.
    pub fn destination_label(&self) -> Option<String> {
        if self.destinations.is_empty() {
            None
        } else {
            Some(self.destinations.join(", "))
        }
    }
}

// ============================================================================
// Outline
// ============================================================================

/// One skeleton day of the outline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutlineDay {
    pub day: u32,
    pub title: String,
    /// Where the traveler sleeps at the end of this day.
    pub overnight_location: String,
    #[serde(default)]
    pub highlight_areas: Vec<String>,
}

/// Low-detail, day-by-day skeleton of the trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outline {
    pub destination: String,
    pub description: String,
    pub days: Vec<OutlineDay>,
}

impl Outline {
    /// Outline days inside the given range, in day order.
    pub fn slice(&self, range: DayRange) -> Vec<OutlineDay> {
        let mut days: Vec<OutlineDay> = self
            .days
            .iter()
            .filter(|d| range.contains(d.day))
            .cloned()
            .collect();
        days.sort_by_key(|d| d.day);
        days
    }

    /// Overnight location recorded for a day.
    pub fn overnight_location(&self, day: u32) -> Option<&str> {
        self.days
            .iter()
            .find(|d| d.day == day)
            .map(|d| d.overnight_location.as_str())
    }

    /// Continuity context handed to the chunk starting at `start_day`.
    ///
    /// Day 1 starts from the destination itself.
    pub fn previous_overnight_location(&self, start_day: u32) -> Option<String> {
        if start_day <= 1 {
            if self.destination.is_empty() {
                None
            } else {
                Some(self.destination.clone())
            }
        } else {
            self.overnight_location(start_day - 1).map(str::to_string)
        }
    }
}

/// Image shown at the top of the itinerary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeroImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photographer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photographer_url: Option<String>,
}

/// Supporting material gathered during outline generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextArticle {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Which model produced the content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
}

// ============================================================================
// Detailed days and the finished itinerary
// ============================================================================

/// A single scheduled activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub time: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A fully detailed day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayPlan {
    pub day: u32,
    pub title: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit: Option<TransitSegment>,
}

/// Source shown alongside the itinerary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl From<&ContextArticle> for Reference {
    fn from(article: &ContextArticle) -> Self {
        Self {
            title: article.title.clone(),
            url: article.url.clone(),
            image: article.image_url.clone(),
            snippet: article.snippet.clone(),
        }
    }
}

/// The finished, persistable itinerary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Itinerary {
    pub id: String,
    pub destination: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<HeroImage>,
    /// Sorted by day number, one entry per day.
    pub days: Vec<DayPlan>,
    #[serde(default)]
    pub references: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
}

impl Itinerary {
    pub fn duration_days(&self) -> u32 {
        self.days.len() as u32
    }
}
