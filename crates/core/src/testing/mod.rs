//! Testing utilities and mock implementations.
//!
//! Mocks for every collaborator of the generation coordinator, so runs can
//! be driven end to end without a model or a database.
//!
//! # Example
//!
//! ```rust,ignore
//! use waypoint_core::testing::{MockChunkProducer, MockOutlineProducer, MockPersistenceSink};
//!
//! let chunks = MockChunkProducer::new();
//! chunks.fail_range(DayRange::new(4, 6), 1).await;
//!
//! // Hand the mocks to GenerationCoordinator::new...
//! ```

mod mock_llm;
mod mock_persistence;
mod mock_producers;

pub use mock_llm::MockLlmClient;
pub use mock_persistence::{MockPersistenceSink, MockPlanStore, RecordedPersist};
pub use mock_producers::{MockChunkProducer, MockOutlineProducer};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::generation::OutlineResult;
    use crate::planner::DayRange;
    use crate::trip::{
        Activity, DayPlan, Itinerary, Outline, OutlineDay, TripDuration, TripPreferences,
    };

    /// Prepared preferences for a decided destination and duration.
    pub fn preferences(destination: &str, days: u32) -> TripPreferences {
        TripPreferences::new(destination, TripDuration::Days(days)).prepared()
    }

    /// An outline that moves to a new town every third day.
    pub fn outline(destination: &str, days: u32) -> Outline {
        Outline {
            destination: destination.to_string(),
            description: format!("{} days around {}.", days, destination),
            days: (1..=days)
                .map(|day| OutlineDay {
                    day,
                    title: format!("{} day {}", destination, day),
                    overnight_location: format!("{} stop {}", destination, (day - 1) / 3 + 1),
                    highlight_areas: vec![format!("Area {}", day)],
                })
                .collect(),
        }
    }

    pub fn outline_result(destination: &str, days: u32) -> OutlineResult {
        OutlineResult::new(outline(destination, days), preferences(destination, days))
    }

    /// A detailed day with two activities.
    pub fn day_plan(day: u32) -> DayPlan {
        DayPlan {
            day,
            title: format!("Day {}", day),
            activities: vec![
                Activity {
                    time: "09:00".to_string(),
                    name: format!("Morning walk {}", day),
                    description: "Start slow.".to_string(),
                    kind: Some("spot".to_string()),
                    location: None,
                },
                Activity {
                    time: "12:30".to_string(),
                    name: format!("Lunch {}", day),
                    description: "Local favourite.".to_string(),
                    kind: Some("meal".to_string()),
                    location: None,
                },
            ],
            transit: None,
        }
    }

    /// One detailed day per day in `range`.
    pub fn day_plans(range: DayRange) -> Vec<DayPlan> {
        range.days().map(day_plan).collect()
    }

    pub fn itinerary(destination: &str, days: u32) -> Itinerary {
        Itinerary {
            id: uuid::Uuid::new_v4().to_string(),
            destination: destination.to_string(),
            description: format!("{} days around {}.", days, destination),
            hero_image: None,
            days: (1..=days).map(day_plan).collect(),
            references: Vec::new(),
            model_info: None,
        }
    }
}
